//! `AwsCli` adapter tests: argument construction, response decoding and
//! error classification against a recording runner.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use amibake_cli::application::ports::{
    ImageApi, ImageRequest, InstanceApi, InstanceRequest, SnapshotApi, VolumeApi,
};
use amibake_cli::domain::{
    AttachmentState, InstanceState, ProviderError, SnapshotStatus, VolumeState,
};
use amibake_cli::infra::aws::{AwsCli, Credentials};

use crate::mocks::{RecordingRunner, SpawnFailure, err_output, ok_output};

fn cli(runner: RecordingRunner) -> AwsCli<RecordingRunner> {
    AwsCli::new(runner, "eu-west-1", None)
}

fn request() -> InstanceRequest<'static> {
    InstanceRequest {
        image_id: "ami-2d18e35a",
        instance_type: "t1.micro",
        key_name: Some("mirage-www"),
        security_group: "mirage-unikernel-builder",
        zone: Some("eu-west-1b"),
    }
}

const RUN_INSTANCES: &[u8] = br#"{
  "ReservationId": "r-1",
  "Instances": [
    { "InstanceId": "i-0abc", "State": { "Code": 0, "Name": "pending" } }
  ]
}"#;

// ── Instances ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn run_instance_builds_run_instances_call() {
    let aws = cli(RecordingRunner::with_responses([ok_output(RUN_INSTANCES)]));
    let host = aws.run_instance(&request()).await.expect("launched");

    assert_eq!(host.id, "i-0abc");
    assert_eq!(host.state, InstanceState::Pending);
    assert_eq!(host.public_address, None);

    let call = aws_runner(&aws).only_call();
    assert_eq!(call.program, "aws");
    assert_eq!(&call.args[..2], ["ec2", "run-instances"]);
    assert_eq!(call.arg_after("--image-id"), Some("ami-2d18e35a"));
    assert_eq!(call.arg_after("--instance-type"), Some("t1.micro"));
    assert_eq!(call.arg_after("--count"), Some("1"));
    assert_eq!(call.arg_after("--security-groups"), Some("mirage-unikernel-builder"));
    assert_eq!(call.arg_after("--key-name"), Some("mirage-www"));
    assert_eq!(call.arg_after("--placement"), Some("AvailabilityZone=eu-west-1b"));
    assert_eq!(call.arg_after("--region"), Some("eu-west-1"));
    assert_eq!(call.arg_after("--output"), Some("json"));
    assert_eq!(call.env_value("AWS_PAGER"), Some(""));
}

#[tokio::test]
async fn run_instance_without_key_omits_key_name() {
    let aws = cli(RecordingRunner::with_responses([ok_output(RUN_INSTANCES)]));
    let req = InstanceRequest {
        key_name: None,
        ..request()
    };
    aws.run_instance(&req).await.expect("launched");
    assert!(!aws_runner(&aws).only_call().args.contains(&"--key-name".to_string()));
}

#[tokio::test]
async fn run_instance_without_zone_omits_placement() {
    let aws = cli(RecordingRunner::with_responses([ok_output(RUN_INSTANCES)]));
    let req = InstanceRequest {
        zone: None,
        ..request()
    };
    aws.run_instance(&req).await.expect("launched");
    assert!(!aws_runner(&aws).only_call().args.contains(&"--placement".to_string()));
}

#[tokio::test]
async fn describe_instance_reads_state_and_address() {
    let body = br#"{"Reservations":[{"Instances":[
        {"InstanceId":"i-0abc","State":{"Name":"running"},"PublicIpAddress":"54.1.2.3"}
    ]}]}"#;
    let aws = cli(RecordingRunner::with_responses([ok_output(body)]));
    let host = aws.describe_instance("i-0abc").await.expect("described");
    assert_eq!(host.state, InstanceState::Running);
    assert_eq!(host.public_address.as_deref(), Some("54.1.2.3"));
    assert!(host.is_reachable());
    assert_eq!(
        aws_runner(&aws).only_call().arg_after("--instance-ids"),
        Some("i-0abc")
    );
}

#[tokio::test]
async fn describe_instance_with_empty_reservations_is_other_error() {
    let aws = cli(RecordingRunner::with_responses([ok_output(br#"{"Reservations":[]}"#)]));
    let err = aws.describe_instance("i-0abc").await.unwrap_err();
    assert!(matches!(err, ProviderError::Other { .. }), "got {err:?}");
    assert!(err.to_string().contains("i-0abc"));
}

#[tokio::test]
async fn unknown_instance_state_is_other_error() {
    let body = br#"{"Reservations":[{"Instances":[
        {"InstanceId":"i-0abc","State":{"Name":"hibernating"}}
    ]}]}"#;
    let aws = cli(RecordingRunner::with_responses([ok_output(body)]));
    let err = aws.describe_instance("i-0abc").await.unwrap_err();
    assert!(err.to_string().contains("hibernating"), "got {err}");
}

// ── Volumes ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_volume_passes_size_and_zone() {
    let body = br#"{"VolumeId":"vol-1","AvailabilityZone":"eu-west-1b","State":"creating","Size":1}"#;
    let aws = cli(RecordingRunner::with_responses([ok_output(body)]));
    let volume = aws.create_volume(1, "eu-west-1b").await.expect("created");
    assert_eq!(volume.id, "vol-1");
    assert_eq!(volume.state, VolumeState::Creating);
    assert_eq!(volume.attachment, AttachmentState::Detached);

    let call = aws_runner(&aws).only_call();
    assert_eq!(call.args[1], "create-volume");
    assert_eq!(call.arg_after("--size"), Some("1"));
    assert_eq!(call.arg_after("--availability-zone"), Some("eu-west-1b"));
}

#[tokio::test]
async fn describe_volume_reads_attachment_state() {
    let body = br#"{"Volumes":[{"VolumeId":"vol-1","AvailabilityZone":"eu-west-1b",
        "State":"in-use","Attachments":[{"State":"attached","Device":"/dev/sdh"}]}]}"#;
    let aws = cli(RecordingRunner::with_responses([ok_output(body)]));
    let volume = aws.describe_volume("vol-1").await.expect("described");
    assert_eq!(volume.state, VolumeState::InUse);
    assert_eq!(volume.attachment, AttachmentState::Attached);
}

#[tokio::test]
async fn attach_volume_ignores_response_body() {
    let aws = cli(RecordingRunner::with_responses([ok_output(b"not json")]));
    aws.attach_volume("vol-1", "i-0abc", "/dev/sdh")
        .await
        .expect("attached");
    let call = aws_runner(&aws).only_call();
    assert_eq!(call.args[1], "attach-volume");
    assert_eq!(call.arg_after("--volume-id"), Some("vol-1"));
    assert_eq!(call.arg_after("--instance-id"), Some("i-0abc"));
    assert_eq!(call.arg_after("--device"), Some("/dev/sdh"));
}

// ── Snapshots and images ──────────────────────────────────────────────────────

#[tokio::test]
async fn snapshot_calls_decode_status() {
    let aws = cli(RecordingRunner::with_responses([
        ok_output(br#"{"SnapshotId":"snap-1","VolumeId":"vol-1","State":"pending"}"#),
        ok_output(br#"{"Snapshots":[{"SnapshotId":"snap-1","VolumeId":"vol-1","State":"completed"}]}"#),
    ]));
    let created = aws.create_snapshot("vol-1").await.expect("created");
    assert_eq!(created.status, SnapshotStatus::Pending);
    let done = aws.describe_snapshot("snap-1").await.expect("described");
    assert_eq!(done.status, SnapshotStatus::Completed);
    assert_eq!(done.volume_id, "vol-1");

    let calls = aws_runner(&aws).calls();
    assert_eq!(calls[0].arg_after("--volume-id"), Some("vol-1"));
    assert_eq!(calls[1].arg_after("--snapshot-ids"), Some("snap-1"));
}

#[tokio::test]
async fn register_image_maps_snapshot_to_root_device() {
    let aws = cli(RecordingRunner::with_responses([ok_output(br#"{"ImageId":"ami-0123abcd"}"#)]));
    let image = aws
        .register_image(&ImageRequest {
            name: "mirage-202601021504",
            snapshot_id: "snap-1",
            kernel_id: "aki-52a34525",
            architecture: "x86_64",
            root_device: "/dev/sda1",
        })
        .await
        .expect("registered");
    assert_eq!(image.id, "ami-0123abcd");
    assert_eq!(image.name, "mirage-202601021504");
    assert_eq!(image.snapshot_id, "snap-1");

    let call = aws_runner(&aws).only_call();
    assert_eq!(call.arg_after("--kernel-id"), Some("aki-52a34525"));
    assert_eq!(call.arg_after("--architecture"), Some("x86_64"));
    assert_eq!(call.arg_after("--root-device-name"), Some("/dev/sda1"));
    let mappings: serde_json::Value =
        serde_json::from_str(call.arg_after("--block-device-mappings").unwrap()).unwrap();
    assert_eq!(mappings[0]["DeviceName"], "/dev/sda1");
    assert_eq!(mappings[0]["Ebs"]["SnapshotId"], "snap-1");
}

// ── Errors and credentials ────────────────────────────────────────────────────

#[tokio::test]
async fn throttling_is_transient() {
    let stderr = b"\nAn error occurred (RequestLimitExceeded) when calling the DescribeVolumes operation (reached max retries: 2): Request limit exceeded.\n";
    let aws = cli(RecordingRunner::with_responses([err_output(stderr)]));
    let err = aws.describe_volume("vol-1").await.unwrap_err();
    assert!(err.is_transient(), "got {err:?}");
    assert_eq!(err.operation(), "DescribeVolumes");
}

#[tokio::test]
async fn fresh_resource_not_found_is_transient() {
    let stderr = b"An error occurred (InvalidInstanceID.NotFound) when calling the DescribeInstances operation: The instance ID 'i-0abc' does not exist";
    let aws = cli(RecordingRunner::with_responses([err_output(stderr)]));
    assert!(aws.describe_instance("i-0abc").await.unwrap_err().is_transient());
}

#[tokio::test]
async fn invalid_parameter_is_rejected() {
    let stderr = b"An error occurred (InvalidAMIID.Malformed) when calling the RunInstances operation: Invalid id: \"ami-zz\"";
    let aws = cli(RecordingRunner::with_responses([err_output(stderr)]));
    let err = aws.run_instance(&request()).await.unwrap_err();
    match err {
        ProviderError::Rejected { code, .. } => assert_eq!(code, "InvalidAMIID.Malformed"),
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn unparseable_stderr_is_other() {
    let aws = cli(RecordingRunner::with_responses([err_output(
        b"Unable to locate credentials. You can configure credentials by running \"aws configure\".",
    )]));
    let err = aws.create_snapshot("vol-1").await.unwrap_err();
    assert!(matches!(err, ProviderError::Other { .. }), "got {err:?}");
    assert!(err.to_string().contains("Unable to locate credentials"));
}

#[tokio::test]
async fn spawn_failure_is_other() {
    let aws = AwsCli::new(SpawnFailure, "eu-west-1", None);
    let err = aws.describe_snapshot("snap-1").await.unwrap_err();
    assert!(matches!(err, ProviderError::Other { .. }), "got {err:?}");
    assert!(!err.is_transient());
}

#[tokio::test]
async fn credentials_are_forwarded_as_environment() {
    let aws = AwsCli::new(
        RecordingRunner::with_responses([ok_output(br#"{"Snapshots":[{"SnapshotId":"snap-1","VolumeId":"vol-1","State":"pending"}]}"#)]),
        "us-east-1",
        Some(Credentials {
            access_key_id: "AKIAEXAMPLE".to_string(),
            secret_access_key: "s3cret".to_string(),
        }),
    );
    aws.describe_snapshot("snap-1").await.expect("described");
    let call = aws_runner(&aws).only_call();
    assert_eq!(call.env_value("AWS_ACCESS_KEY_ID"), Some("AKIAEXAMPLE"));
    assert_eq!(call.env_value("AWS_SECRET_ACCESS_KEY"), Some("s3cret"));
    assert_eq!(call.arg_after("--region"), Some("us-east-1"));
    assert!(!call.args.iter().any(|a| a.contains("s3cret")));
}

#[test]
fn credentials_debug_redacts_secret() {
    let creds = Credentials {
        access_key_id: "AKIAEXAMPLE".to_string(),
        secret_access_key: "s3cret".to_string(),
    };
    let debug = format!("{creds:?}");
    assert!(debug.contains("AKIAEXAMPLE"));
    assert!(!debug.contains("s3cret"));
}

fn aws_runner(aws: &AwsCli<RecordingRunner>) -> &RecordingRunner {
    aws.runner()
}
