//! Configuração do devscout carregada a partir de `devscout.toml`.
//!
//! A struct [`DevscoutConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! A variável de ambiente `GITHUB_TOKEN` tem precedência sobre o arquivo.

use anyhow::Result;
use serde::Deserialize;
use std::path::Path;

/// Configuração de nível superior carregada de `devscout.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct DevscoutConfig {
    /// Token de acesso pessoal para a API do GitHub.
    #[serde(default)]
    pub token: String,

    /// Espera mínima em milissegundos quando uma janela de quota se esgota.
    #[serde(default = "default_backoff_floor_ms")]
    pub backoff_floor_ms: u64,

    /// URL raiz da API, substituível para instalações GitHub Enterprise.
    #[serde(default = "default_api_root")]
    pub api_root: String,
}

// Valor padrão para o piso de backoff: 60000ms, uma janela de busca.
fn default_backoff_floor_ms() -> u64 {
    60_000
}

// Valor padrão para a raiz da API: a instância pública do GitHub.
fn default_api_root() -> String {
    "https://api.github.com".to_string()
}

impl Default for DevscoutConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            backoff_floor_ms: default_backoff_floor_ms(),
            api_root: default_api_root(),
        }
    }
}

impl DevscoutConfig {
    /// Carrega a configuração de `devscout.toml` no diretório atual.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load() -> Result<Self> {
        let path = Path::new("devscout.toml");
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<DevscoutConfig>(&contents)?
        } else {
            Self::default()
        };

        // Variável de ambiente tem precedência sobre o arquivo de configuração para o token.
        if let Ok(token) = std::env::var("GITHUB_TOKEN")
            && !token.is_empty()
        {
            config.token = token;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = DevscoutConfig::default();
        assert!(config.token.is_empty());
        assert_eq!(config.backoff_floor_ms, 60_000);
        assert_eq!(config.api_root, "https://api.github.com");
    }

    #[test]
    fn deserialize_partial_toml() {
        let toml_str = r#"
            token = "ghp_test_123"
            backoff_floor_ms = 5000
        "#;
        let config: DevscoutConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.token, "ghp_test_123");
        assert_eq!(config.backoff_floor_ms, 5000);
        assert_eq!(config.api_root, "https://api.github.com");
    }

    #[test]
    fn deserialize_custom_api_root() {
        let toml_str = r#"api_root = "https://github.example.com/api/v3""#;
        let config: DevscoutConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api_root, "https://github.example.com/api/v3");
        assert_eq!(config.backoff_floor_ms, 60_000);
    }
}
