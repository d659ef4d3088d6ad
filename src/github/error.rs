//! Tipos de erro para o cliente da API do GitHub.
//!
//! Define [`GithubError`] com variantes para rate limiting, erros da API,
//! credenciais rejeitadas e erros de rede. Usa `thiserror` para derivar
//! `Display` e `Error` automaticamente a partir dos atributos
//! `#[error(...)]`.

use thiserror::Error;

use super::client::QuotaBucket;

/// Falhas retornadas pelas chamadas do [`GithubClient`](super::GithubClient).
///
/// A única variante tratada como transitória pelo pipeline é
/// [`RateLimited`](GithubError::RateLimited); todas as outras derrubam o
/// job que as encontrou.
#[derive(Debug, Error)]
pub enum GithubError {
    /// O servidor respondeu 403 ou 429: a quota do bucket está esgotada
    /// até o próximo reset da janela.
    #[error("rate limit exhausted for the {bucket} bucket")]
    RateLimited { bucket: QuotaBucket },

    /// Erro retornado pela API (ex.: 422 busca inválida, 500 erro interno).
    /// Contém o código de status HTTP e o corpo da resposta como mensagem.
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// O servidor rejeitou as credenciais fornecidas.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Falha de rede subjacente (DNS, conexão recusada, timeout).
    /// Encapsula o erro original do `reqwest` via `#[from]`.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}
