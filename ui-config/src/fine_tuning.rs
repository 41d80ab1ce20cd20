use crate::error::{Error, ErrorDetails};
use crate::model::{
    ModelNameProviderConfig, OpenAIProviderConfig, ProviderConfig, ProviderType,
    ThinkBlocksProviderConfig,
};

/// Builds the provider config for a freshly fine-tuned model.
///
/// Only providers that need nothing beyond a model name are supported. The others
/// (e.g. `azure`, which needs a deployment and an endpoint) return an error instead
/// of a partially filled config.
pub fn get_fine_tuned_provider_config(
    model_name: &str,
    provider_type: ProviderType,
) -> Result<ProviderConfig, Error> {
    let model_name = model_name.to_string();
    let simple = |model_name: String| ModelNameProviderConfig {
        model_name,
        api_key_location: None,
    };
    let think_blocks = |model_name: String| ThinkBlocksProviderConfig {
        model_name,
        parse_think_blocks: true,
        api_key_location: None,
    };
    Ok(match provider_type {
        ProviderType::Anthropic => ProviderConfig::Anthropic(simple(model_name)),
        ProviderType::DeepSeek => ProviderConfig::DeepSeek(simple(model_name)),
        ProviderType::Fireworks => ProviderConfig::Fireworks(think_blocks(model_name)),
        ProviderType::GoogleAIStudioGemini => {
            ProviderConfig::GoogleAIStudioGemini(simple(model_name))
        }
        ProviderType::Groq => ProviderConfig::Groq(simple(model_name)),
        ProviderType::Hyperbolic => ProviderConfig::Hyperbolic(simple(model_name)),
        ProviderType::Mistral => ProviderConfig::Mistral(simple(model_name)),
        ProviderType::OpenAI => ProviderConfig::OpenAI(OpenAIProviderConfig {
            model_name,
            api_base: None,
            api_key_location: None,
        }),
        ProviderType::OpenRouter => ProviderConfig::OpenRouter(simple(model_name)),
        ProviderType::Together => ProviderConfig::Together(think_blocks(model_name)),
        ProviderType::XAI => ProviderConfig::XAI(simple(model_name)),
        ProviderType::AWSBedrock
        | ProviderType::AWSSagemaker
        | ProviderType::Azure
        | ProviderType::Dummy
        | ProviderType::GCPVertexAnthropic
        | ProviderType::GCPVertexGemini
        | ProviderType::SGLang
        | ProviderType::TGI
        | ProviderType::VLLM => {
            return Err(Error::new(ErrorDetails::UnsupportedProvider {
                provider_type: provider_type.to_string(),
            }));
        }
    })
}
