//! Startup wiring from configuration to the concrete gateway and archive.

use std::sync::Arc;

use archive_upload::{ArchiveTarget, ArchiveUploader, HttpArchiveUploader};
use chat_api::ApiFlavor;
use model_gateway::ModelGateway;
use model_gateway_chat_api::{
    flavor_for_model, ChatCompletionsGateway, ChatGatewayConfig, MessagesGateway,
};
use model_gateway_mock::{MockGateway, MOCK_GATEWAY_ID};

use crate::config::{ConfigError, InterviewConfig};

pub const OPENAI_API_KEY_ENV_VAR: &str = "OPENAI_API_KEY";
pub const ANTHROPIC_API_KEY_ENV_VAR: &str = "ANTHROPIC_API_KEY";

/// Builds the gateway selected by `config.model`.
///
/// `lookup` resolves secrets by environment variable name.
pub fn gateway_for_config<F>(
    config: &InterviewConfig,
    lookup: F,
) -> Result<Arc<dyn ModelGateway>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let model = config.model.trim();
    if model == MOCK_GATEWAY_ID {
        return Ok(Arc::new(MockGateway::default()));
    }

    let Some(flavor) = flavor_for_model(model) else {
        return Err(ConfigError::UnsupportedModel(model.to_string()));
    };

    let env_var = config
        .api_key_env
        .clone()
        .unwrap_or_else(|| default_api_key_env(flavor).to_string());
    let api_key = lookup(&env_var).ok_or(ConfigError::MissingSecret { env_var })?;

    let mut gateway_config = ChatGatewayConfig::new(api_key, model);
    if let Some(base_url) = &config.base_url {
        gateway_config = gateway_config.with_base_url(base_url.clone());
    }
    if let Some(timeout) = config.timeout() {
        gateway_config = gateway_config.with_timeout(timeout);
    }

    let init_error = |error: model_gateway::GatewayError| ConfigError::Init {
        component: "model gateway",
        message: error.to_string(),
    };

    let gateway: Arc<dyn ModelGateway> = match flavor {
        ApiFlavor::ChatCompletions => {
            Arc::new(ChatCompletionsGateway::new(gateway_config).map_err(init_error)?)
        }
        ApiFlavor::Messages => Arc::new(MessagesGateway::new(gateway_config).map_err(init_error)?),
    };
    tracing::info!(gateway = %gateway.profile().gateway_id, model, "model gateway ready");
    Ok(gateway)
}

/// Builds the remote archive uploader, if one is configured.
pub fn archive_for_config<F>(
    config: &InterviewConfig,
    lookup: F,
) -> Result<Option<Arc<dyn ArchiveUploader>>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(archive) = &config.archive else {
        return Ok(None);
    };

    let token = lookup(&archive.token_env).ok_or_else(|| ConfigError::MissingSecret {
        env_var: archive.token_env.clone(),
    })?;
    let target = ArchiveTarget::new(archive.endpoint.clone(), archive.folder.clone(), token);
    // Reject a malformed endpoint now rather than at the end of an interview.
    target
        .object_url("endpoint-check.csv")
        .map_err(|error| ConfigError::Invalid(error.to_string()))?;

    let uploader =
        HttpArchiveUploader::new(target, config.timeout()).map_err(|error| ConfigError::Init {
            component: "archive uploader",
            message: error.to_string(),
        })?;
    Ok(Some(Arc::new(uploader)))
}

fn default_api_key_env(flavor: ApiFlavor) -> &'static str {
    match flavor {
        ApiFlavor::ChatCompletions => OPENAI_API_KEY_ENV_VAR,
        ApiFlavor::Messages => ANTHROPIC_API_KEY_ENV_VAR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArchiveConfig;

    fn no_secrets(_: &str) -> Option<String> {
        None
    }

    fn config_for(model: &str) -> InterviewConfig {
        InterviewConfig {
            model: model.to_string(),
            ..InterviewConfig::default()
        }
    }

    #[test]
    fn mock_model_needs_no_secret() {
        let gateway = gateway_for_config(&config_for("mock"), no_secrets)
            .expect("mock gateway should resolve");
        assert_eq!(gateway.profile().gateway_id, MOCK_GATEWAY_ID);
    }

    #[test]
    fn gpt_model_builds_chat_completions_gateway() {
        let gateway = gateway_for_config(&config_for("gpt-4o-2024-05-13"), |name| {
            (name == OPENAI_API_KEY_ENV_VAR).then(|| "sk-test".to_string())
        })
        .expect("gpt gateway should resolve");

        let profile = gateway.profile();
        assert_eq!(profile.gateway_id, "chat-completions");
        assert_eq!(profile.model_id, "gpt-4o-2024-05-13");
    }

    #[test]
    fn claude_model_reads_custom_key_variable() {
        let config = InterviewConfig {
            api_key_env: Some("STUDY_KEY".to_string()),
            ..config_for("claude-3-5-sonnet-20240620")
        };

        let gateway = gateway_for_config(&config, |name| {
            (name == "STUDY_KEY").then(|| "key".to_string())
        })
        .expect("claude gateway should resolve");

        assert_eq!(gateway.profile().gateway_id, "messages");
    }

    #[test]
    fn missing_key_names_the_variable() {
        let error = match gateway_for_config(&config_for("claude-3-haiku"), no_secrets) {
            Ok(_) => panic!("missing key should fail"),
            Err(error) => error,
        };

        assert!(matches!(
            error,
            ConfigError::MissingSecret { ref env_var } if env_var == ANTHROPIC_API_KEY_ENV_VAR
        ));
    }

    #[test]
    fn unknown_model_family_is_rejected() {
        let error = match gateway_for_config(&config_for("llama-3-70b"), no_secrets) {
            Ok(_) => panic!("unknown model should fail"),
            Err(error) => error,
        };

        assert!(error.to_string().contains("unsupported model 'llama-3-70b'"));
    }

    #[test]
    fn archive_is_optional() {
        assert!(archive_for_config(&InterviewConfig::default(), no_secrets)
            .expect("no archive configured")
            .is_none());
    }

    #[test]
    fn archive_requires_its_token() {
        let config = InterviewConfig {
            archive: Some(ArchiveConfig {
                endpoint: "https://store.example/v1".to_string(),
                folder: "study".to_string(),
                token_env: "ARCHIVE_TOKEN".to_string(),
            }),
            ..InterviewConfig::default()
        };

        assert!(matches!(
            archive_for_config(&config, no_secrets),
            Err(ConfigError::MissingSecret { .. })
        ));
        assert!(archive_for_config(&config, |_| Some("t".to_string()))
            .expect("archive builds")
            .is_some());
    }
}
