use appship_cloud::executor::{CommandExecutor, ExecOptions, ExecOutput};
use appship_cloud::gcloud::GcloudError;
use appship_cloud::toolchain::{CredentialSource, GcloudSdk, ToolError, ToolManager};
use mockall::mock;
use secrecy::SecretString;
use tempfile::TempDir;

mock! {
    Executor {}

    impl CommandExecutor for Executor {
        async fn exec(
            &self,
            program: &str,
            args: &[String],
            options: &ExecOptions,
        ) -> Result<ExecOutput, GcloudError>;
    }
}

const VERSION_JSON: &str = r#"{"Google Cloud SDK": "410.0.0", "bq": "2.0.81", "core": "2022.12.09"}"#;

fn has(args: &[String], token: &str) -> bool {
    args.iter().any(|a| a == token)
}

fn expect_version(mock: &mut MockExecutor, output: ExecOutput) {
    mock.expect_exec()
        .withf(|_, args, _| has(args, "version"))
        .returning(move |_, _, _| Ok(output.clone()));
}

// ── Installation ──

#[tokio::test]
async fn is_installed_matches_requested_version() {
    let mut mock = MockExecutor::new();
    expect_version(&mut mock, ExecOutput::success(VERSION_JSON));

    let sdk = GcloudSdk::with_executor(mock);

    assert!(sdk.is_installed("410.0.0").await);
    assert!(sdk.is_installed("latest").await);
    assert!(!sdk.is_installed("411.0.0").await);
}

#[tokio::test]
async fn is_installed_false_when_gcloud_missing() {
    let mut mock = MockExecutor::new();
    mock.expect_exec().returning(|program, _, _| {
        Err(GcloudError::NotFound {
            program: program.to_owned(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        })
    });

    let sdk = GcloudSdk::with_executor(mock);
    assert!(!sdk.is_installed("latest").await);
}

#[tokio::test]
async fn resolve_latest_uses_installed_version() {
    let mut mock = MockExecutor::new();
    expect_version(&mut mock, ExecOutput::success(VERSION_JSON));

    let sdk = GcloudSdk::with_executor(mock);
    assert_eq!(sdk.resolve_latest_version().await.unwrap(), "410.0.0");
}

#[tokio::test]
async fn resolve_latest_fails_without_gcloud() {
    let mut mock = MockExecutor::new();
    expect_version(&mut mock, ExecOutput::failure(127, "command not found"));

    let sdk = GcloudSdk::with_executor(mock);
    assert!(matches!(
        sdk.resolve_latest_version().await,
        Err(ToolError::InstallUnsupported { .. })
    ));
}

#[tokio::test]
async fn install_is_unsupported() {
    let sdk = GcloudSdk::with_executor(MockExecutor::new());
    let err = sdk.install("410.0.0").await.unwrap_err();
    assert!(err.to_string().contains("410.0.0"));
}

#[tokio::test]
async fn install_component_runs_components_install() {
    let mut mock = MockExecutor::new();
    mock.expect_exec()
        .withf(|program, args, _| {
            program == "gcloud" && args == ["components", "install", "beta", "--quiet"]
        })
        .times(1)
        .returning(|_, _, _| Ok(ExecOutput::success("")));

    let sdk = GcloudSdk::with_executor(mock);
    sdk.install_component("beta").await.unwrap();
}

#[tokio::test]
async fn install_component_failure() {
    let mut mock = MockExecutor::new();
    mock.expect_exec()
        .returning(|_, _, _| Ok(ExecOutput::failure(1, "permission denied")));

    let sdk = GcloudSdk::with_executor(mock);
    let err = sdk.install_component("alpha").await.unwrap_err();
    assert!(matches!(err, ToolError::Command { .. }));
}

// ── Authentication ──

#[tokio::test]
async fn authenticate_with_key_file() {
    let mut mock = MockExecutor::new();
    mock.expect_exec()
        .withf(|_, args, _| {
            has(args, "activate-service-account")
                && args.windows(2).any(|w| w[0] == "--key-file" && w[1] == "/keys/sa.json")
        })
        .times(1)
        .returning(|_, _, _| Ok(ExecOutput::success("")));

    let sdk = GcloudSdk::with_executor(mock);
    sdk.authenticate(&CredentialSource::KeyFile("/keys/sa.json".into()))
        .await
        .unwrap();
}

#[tokio::test]
async fn authenticate_with_inline_key_stages_a_file() {
    let mut mock = MockExecutor::new();
    mock.expect_exec()
        .withf(|_, args, _| has(args, "activate-service-account"))
        .times(1)
        .returning(|_, args, _| {
            let idx = args.iter().position(|a| a == "--key-file").unwrap();
            let staged = std::fs::read_to_string(&args[idx + 1]).unwrap();
            assert!(staged.contains("my-key-project"));
            Ok(ExecOutput::success(""))
        });

    let sdk = GcloudSdk::with_executor(mock);
    let key = SecretString::from(r#"{"project_id":"my-key-project"}"#.to_owned());
    sdk.authenticate(&CredentialSource::KeyJson(key)).await.unwrap();
}

#[tokio::test]
async fn is_authenticated_checks_active_account() {
    let mut active = MockExecutor::new();
    active
        .expect_exec()
        .withf(|_, args, _| has(args, "list") && has(args, "status:ACTIVE"))
        .returning(|_, _, _| Ok(ExecOutput::success("ci@my-project.iam.gserviceaccount.com\n")));
    assert!(GcloudSdk::with_executor(active).is_authenticated().await);

    let mut inactive = MockExecutor::new();
    inactive
        .expect_exec()
        .returning(|_, _, _| Ok(ExecOutput::success("\n")));
    assert!(!GcloudSdk::with_executor(inactive).is_authenticated().await);
}

#[tokio::test]
async fn is_authenticated_false_when_listing_fails() {
    let mut mock = MockExecutor::new();
    mock.expect_exec()
        .withf(|_, args, _| has(args, "auth") && has(args, "list"))
        .times(1)
        .returning(|_, _, _| Ok(ExecOutput::failure(1, "ERROR: (gcloud.auth.list) boom")));

    assert!(!GcloudSdk::with_executor(mock).is_authenticated().await);
}

#[tokio::test]
async fn uses_configured_program_and_env() {
    let mut mock = MockExecutor::new();
    mock.expect_exec()
        .withf(|program, _, options| {
            program == "/opt/google-cloud-sdk/bin/gcloud"
                && options.envs == [("CLOUDSDK_CORE_DISABLE_PROMPTS".to_owned(), "1".to_owned())]
        })
        .returning(|_, _, _| Ok(ExecOutput::success("")));

    let sdk = GcloudSdk::with_executor(mock)
        .program("/opt/google-cloud-sdk/bin/gcloud")
        .env("CLOUDSDK_CORE_DISABLE_PROMPTS", "1");

    assert_eq!(sdk.invocation_command(), "/opt/google-cloud-sdk/bin/gcloud");
    sdk.install_component("beta").await.unwrap();
}

// ── Credentials ──

#[test]
fn project_id_from_key_file() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("key.json");
    std::fs::write(&path, r#"{"type":"service_account","project_id":"from-key"}"#).unwrap();

    let project = CredentialSource::KeyFile(path).project_id().unwrap();
    assert_eq!(project.as_deref(), Some("from-key"));
}

#[test]
fn project_id_absent_from_key() {
    let key = SecretString::from(r#"{"type":"service_account"}"#.to_owned());
    assert_eq!(CredentialSource::KeyJson(key).project_id().unwrap(), None);
}

#[test]
fn project_id_from_invalid_key() {
    let key = SecretString::from("not json".to_owned());
    assert!(matches!(
        CredentialSource::KeyJson(key).project_id(),
        Err(ToolError::CredentialsParse { .. })
    ));
}

#[test]
fn project_id_from_missing_key_file() {
    let err = CredentialSource::KeyFile("/definitely/missing.json".into())
        .project_id()
        .unwrap_err();
    assert!(matches!(err, ToolError::CredentialsRead { .. }));
}
