//! Tipos de domínio e DTOs de transporte da API do GitHub.
//!
//! Os tipos de busca ([`SearchKey`], [`UserProfile`], [`RepoActivity`],
//! [`UserRecord`]) são o que os chamadores veem; as structs `Api*` espelham
//! o JSON que a API v3 do GitHub realmente envia e ficam internas ao cliente.

use serde::{Deserialize, Serialize};

use crate::engine::RateLimitStatus;

/// O que o chamador sabe sobre um desenvolvedor: qualquer combinação de
/// primeiro nome, sobrenome e localização. Campos `None` não entram na busca.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchKey {
    /// Primeiro nome do desenvolvedor.
    #[serde(default)]
    pub first_name: Option<String>,
    /// Sobrenome do desenvolvedor.
    #[serde(default)]
    pub last_name: Option<String>,
    /// Localização declarada no perfil (ex.: "London").
    #[serde(default)]
    pub location: Option<String>,
}

impl SearchKey {
    /// Chave para o nome de uma pessoa; partes vazias são tratadas como ausentes.
    pub fn named(first: &str, last: &str) -> Self {
        Self {
            first_name: non_empty_str(first),
            last_name: non_empty_str(last),
            location: None,
        }
    }

    /// Adiciona um qualificador de localização à chave.
    pub fn with_location(mut self, location: &str) -> Self {
        self.location = non_empty_str(location);
        self
    }

    /// Monta a expressão de busca enviada como parâmetro `q`:
    /// `"<first> <last> type:user in:fullname [location:<loc>]"`, com partes
    /// vazias do nome omitidas.
    pub fn query(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if let Some(first) = self.first_name.as_deref()
            && !first.is_empty()
        {
            parts.push(first);
        }
        if let Some(last) = self.last_name.as_deref()
            && !last.is_empty()
        {
            parts.push(last);
        }
        parts.push("type:user");
        parts.push("in:fullname");
        let mut query = parts.join(" ");
        if let Some(location) = self.location.as_deref()
            && !location.is_empty()
        {
            query.push_str(" location:");
            query.push_str(location);
        }
        query
    }
}

fn non_empty_str(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Campos públicos de perfil mantidos para cada desenvolvedor encontrado.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Login (username) no GitHub.
    pub login: String,
    /// Nome completo exibido no perfil.
    pub name: Option<String>,
    /// Empresa declarada no perfil.
    pub company: Option<String>,
    /// URL do blog ou site pessoal.
    pub blog: Option<String>,
    /// Localização declarada no perfil.
    pub location: Option<String>,
    /// E-mail público do perfil.
    pub email: Option<String>,
}

/// Um repositório com o número de commits que o usuário encontrado é autor
/// nele (primeira página da listagem de commits, conforme reportado pela API).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoActivity {
    /// Nome do repositório.
    pub name: String,
    /// Commits de autoria do usuário na primeira página da listagem.
    pub commits: u32,
}

/// Tudo que foi coletado para um desenvolvedor encontrado.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Perfil público do desenvolvedor.
    pub profile: UserProfile,
    /// Repositórios com a contagem de commits de autoria dele.
    pub repos: Vec<RepoActivity>,
}

/// As duas janelas de quota conforme reportadas por `/rate_limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSnapshot {
    /// Janela `core`, usada pelas chamadas de perfil e repositório.
    pub core: RateLimitStatus,
    /// Janela `search`, usada pelas chamadas de busca.
    pub search: RateLimitStatus,
}

// --- DTOs de transporte ---

/// Corpo de `/search/users`. Apenas os itens ranqueados importam aqui.
#[derive(Debug, Deserialize)]
pub struct SearchUsersResponse {
    pub items: Vec<SearchedUser>,
}

#[derive(Debug, Deserialize)]
pub struct SearchedUser {
    pub login: String,
}

/// Corpo de `/users/{login}`. O GitHub reporta campos não preenchidos como
/// `null` ou `""`.
#[derive(Debug, Deserialize)]
pub struct ApiUser {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub blog: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl From<ApiUser> for UserProfile {
    fn from(user: ApiUser) -> Self {
        Self {
            login: user.login,
            name: non_empty(user.name),
            company: non_empty(user.company),
            blog: non_empty(user.blog),
            location: non_empty(user.location),
            email: non_empty(user.email),
        }
    }
}

fn non_empty(field: Option<String>) -> Option<String> {
    field.filter(|value| !value.is_empty())
}

/// Um elemento de `/users/{login}/repos`.
#[derive(Debug, Deserialize)]
pub struct ApiRepo {
    pub name: String,
    pub owner: ApiRepoOwner,
}

#[derive(Debug, Deserialize)]
pub struct ApiRepoOwner {
    pub login: String,
}

/// Um elemento de uma listagem de commits. Apenas a presença é contada.
#[derive(Debug, Deserialize)]
pub struct ApiCommit {}

/// Corpo de `/rate_limit`.
#[derive(Debug, Deserialize)]
pub struct RateLimitResponse {
    pub resources: RateLimitResources,
}

#[derive(Debug, Deserialize)]
pub struct RateLimitResources {
    pub core: RateLimitEntry,
    pub search: RateLimitEntry,
}

#[derive(Debug, Deserialize)]
pub struct RateLimitEntry {
    pub limit: u32,
    pub remaining: u32,
    pub reset: u64,
}

impl RateLimitEntry {
    /// Anexa a duração fixa da janela do bucket aos números de transporte.
    pub(crate) fn into_status(self, window_secs: u32) -> RateLimitStatus {
        RateLimitStatus {
            reset_epoch_secs: self.reset,
            remaining: self.remaining,
            limit: self.limit,
            window_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_with_name_and_location() {
        let key = SearchKey::named("Ada", "Lovelace").with_location("London");
        assert_eq!(key.query(), "Ada Lovelace type:user in:fullname location:London");
    }

    #[test]
    fn query_without_location() {
        let key = SearchKey::named("Ada", "Lovelace");
        assert_eq!(key.query(), "Ada Lovelace type:user in:fullname");
    }

    #[test]
    fn query_with_partial_name() {
        let key = SearchKey::named("", "Lovelace");
        assert_eq!(key.query(), "Lovelace type:user in:fullname");
    }

    #[test]
    fn query_with_location_only() {
        let key = SearchKey::named("", "").with_location("London");
        assert_eq!(key.query(), "type:user in:fullname location:London");
    }

    #[test]
    fn search_key_deserializes_missing_fields_as_none() {
        let key: SearchKey = serde_json::from_str(r#"{"first_name": "Ada"}"#).unwrap();
        assert_eq!(key.first_name.as_deref(), Some("Ada"));
        assert_eq!(key.last_name, None);
        assert_eq!(key.location, None);
    }

    #[test]
    fn api_user_from_api_format() {
        let api_json = r#"{
            "login": "octocat",
            "id": 583231,
            "name": "The Octocat",
            "company": "@github",
            "blog": "",
            "location": null,
            "email": null,
            "public_repos": 8
        }"#;
        let user: ApiUser = serde_json::from_str(api_json).unwrap();
        let profile = UserProfile::from(user);
        assert_eq!(profile.login, "octocat");
        assert_eq!(profile.name.as_deref(), Some("The Octocat"));
        assert_eq!(profile.company.as_deref(), Some("@github"));
        assert_eq!(profile.blog, None, "empty string should normalize to None");
        assert_eq!(profile.location, None);
        assert_eq!(profile.email, None);
    }

    #[test]
    fn rate_limit_response_from_api_format() {
        let api_json = r#"{
            "resources": {
                "core": {"limit": 5000, "remaining": 4999, "reset": 1372700873},
                "search": {"limit": 30, "remaining": 18, "reset": 1372697452},
                "graphql": {"limit": 5000, "remaining": 5000, "reset": 1372700389}
            },
            "rate": {"limit": 5000, "remaining": 4999, "reset": 1372700873}
        }"#;
        let body: RateLimitResponse = serde_json::from_str(api_json).unwrap();
        let core = body.resources.core.into_status(3600);
        let search = body.resources.search.into_status(60);
        assert_eq!(core.limit, 5000);
        assert_eq!(core.reset_epoch_secs, 1372700873);
        assert_eq!(core.window_secs, 3600);
        assert_eq!(search.remaining, 18);
        assert_eq!(search.window_secs, 60);
    }

    #[test]
    fn commit_listing_counts_by_length() {
        let api_json = r#"[
            {"sha": "a1", "commit": {"message": "one"}},
            {"sha": "b2", "commit": {"message": "two"}}
        ]"#;
        let commits: Vec<ApiCommit> = serde_json::from_str(api_json).unwrap();
        assert_eq!(commits.len(), 2);
    }

    #[test]
    fn user_record_serializes_for_output() {
        let record = UserRecord {
            profile: UserProfile {
                login: "octocat".into(),
                name: Some("The Octocat".into()),
                company: None,
                blog: None,
                location: Some("San Francisco".into()),
                email: None,
            },
            repos: vec![RepoActivity {
                name: "hello-world".into(),
                commits: 12,
            }],
        };
        let json = serde_json::to_string(&record).unwrap();
        let parsed: UserRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }
}
