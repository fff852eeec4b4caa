mod cli;
mod commands;
mod env_loader;
mod error;
mod upgrade;

use crate::error::UpgradeError;

fn main() {
    let _ = env_loader::load_dotenv();

    if let Err(err) = cli::run() {
        match err.downcast_ref::<UpgradeError>() {
            Some(typed) => eprintln!("error[{}]: {err:#}", typed.code().as_str()),
            None => eprintln!("error: {err:#}"),
        }
        std::process::exit(1);
    }
}
