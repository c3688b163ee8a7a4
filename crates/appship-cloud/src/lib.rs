pub mod command;
pub mod deployer;
pub mod executor;
pub mod gcloud;
pub mod response;
pub mod toolchain;

pub use command::{DeployOptions, build_deploy_command, build_describe_command};
pub use deployer::{DeployError, DeployOutputs, DeployRequest, Deployer};
pub use executor::{CommandExecutor, ExecOptions, ExecOutput, RealExecutor};
pub use gcloud::GcloudError;
pub use response::{
    DeployResponse, DeployedVersion, DescribeResponse, ResponseError, parse_deploy_response,
    parse_deploy_response_tolerant, parse_describe_response,
};
pub use toolchain::{CredentialSource, GcloudSdk, ToolError, ToolHandle, ToolManager};
