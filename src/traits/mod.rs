pub mod filesystem;
pub mod user_input;
pub mod output;
pub mod command;
pub mod http;

pub use filesystem::{FileSystem, RealFileSystem};
pub use user_input::{UserInput, InquireUserInput};
pub use output::{Output, TerminalOutput};
pub use command::{CommandExecutor, CommandTimedOut, RealCommandExecutor};
pub use http::{HttpClient, ReqwestClient};

#[cfg(test)]
pub use filesystem::MockFileSystem;
#[cfg(test)]
pub use user_input::{MockResponse, MockUserInput};
#[cfg(test)]
pub use output::{MockOutput, OutputMessage};
#[cfg(test)]
pub use command::{MockCommandExecutor, MockCommandResult};
#[cfg(test)]
pub use http::MockHttpClient;
