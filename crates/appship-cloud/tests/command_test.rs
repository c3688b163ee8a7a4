use appship_cloud::command::{
    DeployOptions, build_deploy_command, build_describe_command, command_string,
};
use appship_cloud::response::DeployResponse;
use appship_core::ReleaseChannel;

fn contains_seq(args: &[String], seq: &[&str]) -> bool {
    args.windows(seq.len())
        .any(|w| w.iter().zip(seq).all(|(a, b)| a == b))
}

fn deployed() -> DeployResponse {
    DeployResponse {
        project: "my-project".to_owned(),
        service: "default".to_owned(),
        version_id: "123".to_owned(),
    }
}

// ── Deploy ──

#[test]
fn deploy_defaults() {
    let args = build_deploy_command(&DeployOptions::default());
    assert_eq!(
        args,
        vec!["app", "deploy", "--quiet", "--format", "json", "app.yaml", "--promote"]
    );
}

#[test]
fn deploy_full_order() {
    let args = build_deploy_command(&DeployOptions {
        channel: ReleaseChannel::Ga,
        deliverables: vec!["app.yaml".to_owned(), "cron.yaml".to_owned()],
        project_id: Some("my-test-project".to_owned()),
        image_url: Some("gcr.io/foo/bar".to_owned()),
        version: Some("123".to_owned()),
        promote: false,
        json_output: true,
        flags: vec!["--log-http".to_owned(), "--foo".to_owned(), "bar".to_owned()],
    });

    assert_eq!(
        args,
        vec![
            "app",
            "deploy",
            "--quiet",
            "--format",
            "json",
            "app.yaml",
            "cron.yaml",
            "--project",
            "my-test-project",
            "--image-url",
            "gcr.io/foo/bar",
            "--version",
            "123",
            "--no-promote",
            "--log-http",
            "--foo",
            "bar",
        ]
    );
}

#[test]
fn deploy_sets_project() {
    let args = build_deploy_command(&DeployOptions {
        project_id: Some("my-test-project".to_owned()),
        ..Default::default()
    });
    assert!(contains_seq(&args, &["--project", "my-test-project"]));
}

#[test]
fn deploy_sets_image_url() {
    let args = build_deploy_command(&DeployOptions {
        image_url: Some("gcr.io/foo/bar".to_owned()),
        ..Default::default()
    });
    assert!(contains_seq(&args, &["--image-url", "gcr.io/foo/bar"]));
}

#[test]
fn deploy_sets_version() {
    let args = build_deploy_command(&DeployOptions {
        version: Some("123".to_owned()),
        ..Default::default()
    });
    assert!(contains_seq(&args, &["--version", "123"]));
}

#[test]
fn deploy_promote_flags_are_exclusive() {
    let promoted = build_deploy_command(&DeployOptions::default());
    assert!(promoted.contains(&"--promote".to_owned()));
    assert!(!promoted.contains(&"--no-promote".to_owned()));

    let unpromoted = build_deploy_command(&DeployOptions {
        promote: false,
        ..Default::default()
    });
    assert!(unpromoted.contains(&"--no-promote".to_owned()));
    assert!(!unpromoted.contains(&"--promote".to_owned()));
}

#[test]
fn deploy_skips_empty_optional_values() {
    let args = build_deploy_command(&DeployOptions {
        project_id: Some(String::new()),
        image_url: Some(String::new()),
        version: None,
        ..Default::default()
    });
    assert!(!args.contains(&"--project".to_owned()));
    assert!(!args.contains(&"--image-url".to_owned()));
    assert!(!args.contains(&"--version".to_owned()));
}

#[test]
fn deploy_appends_flags_last() {
    let args = build_deploy_command(&DeployOptions {
        project_id: Some("a".to_owned()),
        flags: vec!["--project".to_owned(), "b".to_owned()],
        ..Default::default()
    });
    assert_eq!(&args[args.len() - 2..], ["--project", "b"]);
}

#[test]
fn deploy_without_json_output() {
    let args = build_deploy_command(&DeployOptions {
        json_output: false,
        ..Default::default()
    });
    assert!(!args.contains(&"--format".to_owned()));
    assert_eq!(&args[..3], ["app", "deploy", "--quiet"]);
}

#[test]
fn deploy_prefixes_channel() {
    let args = build_deploy_command(&DeployOptions {
        channel: ReleaseChannel::Beta,
        ..Default::default()
    });
    assert_eq!(&args[..3], ["beta", "app", "deploy"]);
}

// ── Describe ──

#[test]
fn describe_vector() {
    let args = build_describe_command(&deployed(), ReleaseChannel::Ga);
    assert_eq!(
        args,
        vec![
            "app",
            "versions",
            "describe",
            "--quiet",
            "--format",
            "json",
            "--project",
            "my-project",
            "--service",
            "default",
            "123",
        ]
    );
}

#[test]
fn describe_prefixes_channel() {
    let args = build_describe_command(&deployed(), ReleaseChannel::Alpha);
    assert_eq!(args[0], "alpha");
    assert!(contains_seq(
        &args,
        &["--project", "my-project", "--service", "default", "123"]
    ));
}

#[test]
fn command_string_joins_program_and_args() {
    let args = vec!["app".to_owned(), "deploy".to_owned()];
    assert_eq!(command_string("gcloud", &args), "gcloud app deploy");
}
