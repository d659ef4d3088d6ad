//! Interface de terminal do devscout: spinner e saída colorida.
//!
//! Usa as crates `indicatif` para o spinner de progresso e `console` para
//! estilização com cores. O [`SearchProgress`] mantém o terminal vivo
//! enquanto o pipeline aguarda janelas de quota.

use chrono::{DateTime, Local};
use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::engine::RateLimitStatus;
use crate::github::RateLimitSnapshot;

/// Indicador visual de progresso para uma execução de busca no terminal.
///
/// Exibe um spinner animado durante o processamento e um resumo colorido
/// ao final: resolvidos em verde, sem correspondência em amarelo.
pub struct SearchProgress {
    // Barra de progresso/spinner do indicatif.
    pb: ProgressBar,
    // Estilo verde para o resumo de sucesso.
    green: Style,
    // Estilo amarelo para chaves sem resultado.
    yellow: Style,
}

impl SearchProgress {
    /// Inicia o spinner para uma execução sobre `total` chaves de busca.
    pub fn start(total: usize) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .expect("invalid template"),
        );
        pb.set_message(format!("Searching {total} developers..."));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            yellow: Style::new().yellow(),
        }
    }

    /// Finaliza o spinner e exibe o resumo resolvidos/total.
    ///
    /// Chaves sem correspondência ou descartadas por erro aparecem em amarelo.
    pub fn finish(&self, found: usize, total: usize) {
        self.pb.finish_and_clear();
        println!(
            "  {} Resolved {found} of {total} developers",
            self.green.apply_to("✓")
        );
        let missed = total.saturating_sub(found);
        if missed > 0 {
            println!(
                "  {} {missed} had no match or were dropped",
                self.yellow.apply_to("!")
            );
        }
    }
}

/// Imprime as duas janelas de quota com chamadas restantes e horário local de reset.
pub fn print_limits(snapshot: &RateLimitSnapshot) {
    println!("{}", Style::new().bold().apply_to("GitHub API quotas"));
    print_bucket("core", &snapshot.core);
    print_bucket("search", &snapshot.search);
}

// Linha de uma janela: vermelho quando esgotada, verde caso contrário.
fn print_bucket(name: &str, status: &RateLimitStatus) {
    let style = if status.remaining == 0 {
        Style::new().red().bold()
    } else {
        Style::new().green()
    };
    let reset = DateTime::from_timestamp(status.reset_epoch_secs as i64, 0)
        .map(|utc| utc.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "unknown".to_string());
    println!(
        "  {:<7} {} of {} remaining, resets at {reset}",
        name,
        style.apply_to(status.remaining),
        status.limit,
    );
}

/// Imprime um erro fatal em vermelho no stderr.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {err:#}", Style::new().red().bold().apply_to("✗"));
}
