//! Interface de linha de comando do devscout baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (run, limits)
//! e flags globais (--token, --username/--password, --verbose).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::github::Credentials;

/// devscout: busca desenvolvedores no GitHub por nome e localização.
#[derive(Debug, Parser)]
#[command(name = "devscout", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Token de acesso pessoal. Tem precedência sobre GITHUB_TOKEN e devscout.toml.
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Nome de usuário para autenticação básica.
    #[arg(long, global = true, requires = "password")]
    pub username: Option<String>,

    /// Senha para autenticação básica.
    #[arg(long, global = true, requires = "username")]
    pub password: Option<String>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Busca os desenvolvedores listados em um arquivo de entrada.
    Run {
        /// Arquivo CSV ou JSON com as chaves de busca.
        #[arg(long)]
        input: PathBuf,

        /// Onde gravar os resultados em JSON; stdout quando omitido.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Show the current state of both API quota buckets.
    Limits,
}

impl Cli {
    /// Resolve o esquema de credenciais: flags explícitas vencem o token
    /// configurado (que já incorpora GITHUB_TOKEN), que vence o anônimo.
    pub fn credentials(&self, config_token: &str) -> Credentials {
        if let Some(token) = &self.token {
            return Credentials::Token(token.clone());
        }
        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            return Credentials::Basic {
                username: username.clone(),
                password: password.clone(),
            };
        }
        if !config_token.is_empty() {
            return Credentials::Token(config_token.to_string());
        }
        Credentials::Anonymous
    }
}
