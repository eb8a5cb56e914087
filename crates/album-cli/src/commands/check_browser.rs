use album_core::environment::{ClientSignals, EnvironmentGuard};

use crate::error::CliError;

pub fn run_check_browser(signals: &ClientSignals) -> Result<bool, CliError> {
    let guard = EnvironmentGuard::with_defaults()?;
    let restricted = guard.is_restricted_browser_context(signals);

    if restricted {
        println!("restricted: uploads may not work in this in-app browser");
    } else {
        println!("ok");
    }

    Ok(restricted)
}
