//! Terminal prompts

use dh_deploy::{
    Confirmer, CredentialDefaults, CredentialProvider, DatabaseCredentials, DeployError,
    DeployResult,
};
use dialoguer::{Confirm, Input, Password};

fn prompt_error(err: dialoguer::Error) -> DeployError {
    DeployError::Prompt(err.to_string())
}

/// Asks on the terminal, defaulting to no.
pub(crate) struct TerminalConfirmer;

impl Confirmer for TerminalConfirmer {
    fn confirm(&self, question: &str) -> DeployResult<bool> {
        Confirm::new()
            .with_prompt(question)
            .default(false)
            .interact()
            .map_err(prompt_error)
    }
}

/// Asks for database name, user and password on the terminal.
pub(crate) struct TerminalCredentials;

impl CredentialProvider for TerminalCredentials {
    fn credentials(
        &self,
        defaults: &CredentialDefaults,
        attempt: u32,
    ) -> DeployResult<DatabaseCredentials> {
        if attempt > 1 {
            eprintln!("The database refused the credentials, please try again.");
        }

        let mut database = Input::<String>::new().with_prompt("Database name");
        if let Some(name) = &defaults.database {
            database = database.default(name.clone());
        }
        let database = database.interact_text().map_err(prompt_error)?;

        let user = Input::<String>::new()
            .with_prompt("Database user")
            .default(defaults.user.clone())
            .interact_text()
            .map_err(prompt_error)?;

        let password = match &defaults.password {
            Some(configured) if attempt == 1 => configured.clone(),
            _ => Password::new()
                .with_prompt("Database password")
                .allow_empty_password(true)
                .interact()
                .map_err(prompt_error)?,
        };

        Ok(DatabaseCredentials {
            database,
            user,
            password,
        })
    }
}
