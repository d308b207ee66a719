// ==========================================
// 人事薪资后台 - 命令行入口
// ==========================================
// 子命令: import / delete / history / config / hash-password
// 当前用户来自环境变量（HR_IMPORT_USER / HR_IMPORT_PASSWORD_HASH / HR_IMPORT_PERMISSIONS）
// ==========================================

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use hr_import::app::{
    get_default_db_path, hash_password, AppState, SessionUser, StaticSessionStore, DELETE_PERMISSION,
};
use hr_import::domain::payroll::month_start;
use hr_import::engine::{ConflictOutcome, DeleteOutcome, UploadOutcome};
use hr_import::importer::cell_normalizer::parse_date_text;
use hr_import::{RecordKind, TargetPeriod};
use std::collections::BTreeSet;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "hr-import", version, about = "Importação de planilhas de RH e folha")]
struct Cli {
    /// Caminho do banco SQLite (padrão: diretório de dados do usuário)
    #[arg(long, env = "HR_IMPORT_DB_PATH")]
    db: Option<String>,

    /// Idioma das mensagens (pt-BR | en)
    #[arg(long, default_value = "pt-BR")]
    locale: String,

    #[command(flatten)]
    user: UserArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct UserArgs {
    #[arg(long = "user", env = "HR_IMPORT_USER", default_value = "operador")]
    name: String,

    /// SHA-256 da senha (ver `hash-password`)
    #[arg(long = "password-hash", env = "HR_IMPORT_PASSWORD_HASH", default_value = "")]
    password_hash: String,

    #[arg(long, env = "HR_IMPORT_PERMISSIONS", default_value = "")]
    permissions: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Importa uma planilha (.xlsx / .xls / .csv)
    Import {
        /// employee | payroll | overtime
        #[arg(long)]
        kind: String,
        file: PathBuf,
    },
    /// Exclui todos os registros de um período (MM/AAAA ou datas separadas por vírgula)
    Delete {
        #[arg(long)]
        kind: String,
        #[arg(long)]
        period: String,
    },
    /// Lista o histórico de importações
    History {
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Mostra ou altera a configuração
    Config {
        #[arg(long, num_args = 2, value_names = ["KEY", "VALUE"])]
        set: Option<Vec<String>>,
    },
    /// Gera o hash SHA-256 de uma senha
    HashPassword { password: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    if std::env::var("HR_IMPORT_LOG_JSON").is_ok_and(|v| v == "1") {
        hr_import::logging::init_json();
    } else {
        hr_import::logging::init();
    }

    let cli = Cli::parse();
    hr_import::i18n::set_locale(&cli.locale);

    if let Command::HashPassword { password } = &cli.command {
        println!("{}", hash_password(password));
        return Ok(());
    }

    let db_path = cli.db.clone().unwrap_or_else(get_default_db_path);
    tracing::info!("{} v{} - banco: {}", hr_import::APP_NAME, hr_import::VERSION, db_path);

    let user = SessionUser {
        id: cli.user.name.clone(),
        display_name: cli.user.name.clone(),
        password_hash: cli.user.password_hash.clone(),
        permissions: cli.user.permissions.clone(),
    };
    let state = AppState::new(db_path, Arc::new(StaticSessionStore::new(user.clone())))
        .await
        .map_err(|e| anyhow!(e))?;

    match cli.command {
        Command::Import { kind, file } => run_import(&state, parse_kind(&kind)?, &file).await,
        Command::Delete { kind, period } => {
            let kind = parse_kind(&kind)?;
            run_delete(&state, kind, parse_period(kind, &period)?, &user).await
        }
        Command::History { search, page } => run_history(&state, search.as_deref(), page).await,
        Command::Config { set } => run_config(&state, set),
        Command::HashPassword { .. } => Ok(()),
    }
}

fn parse_kind(raw: &str) -> Result<RecordKind> {
    RecordKind::parse(raw).ok_or_else(|| anyhow!("tipo desconhecido: {}", raw))
}

/// "03/2025" → 月份；"10/03/2025,11/03/2025" → 日期集合
fn parse_period(kind: RecordKind, raw: &str) -> Result<TargetPeriod> {
    if kind == RecordKind::PayrollClosure {
        let date = parse_date_text(&format!("01/{}", raw.trim()))
            .or_else(|| parse_date_text(raw))
            .ok_or_else(|| anyhow!("competência inválida: {}", raw))?;
        return Ok(TargetPeriod::Month(month_start(date)));
    }

    let dates = raw
        .split(',')
        .map(|s| parse_date_text(s).ok_or_else(|| anyhow!("data inválida: {}", s.trim())))
        .collect::<Result<BTreeSet<_>>>()?;
    if dates.is_empty() {
        bail!("nenhuma data informada");
    }
    Ok(TargetPeriod::Dates(dates))
}

fn prompt_password(label: &str) -> Result<String> {
    print!("{} ", label);
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

async fn run_import(state: &AppState, kind: RecordKind, file: &Path) -> Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("lendo {}", file.display()))?;
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let mut pipeline = state.import_pipeline();
    let result = pipeline.select_file(kind, &file_name, &bytes).await;
    for row_error in &pipeline.session().row_errors {
        let fields: Vec<String> = row_error
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        println!("  linha {}: {}", row_error.row_index, fields.join("; "));
    }
    result?;

    let mut outcome = pipeline.upload().await?;
    loop {
        match outcome {
            UploadOutcome::Committed(summary) => {
                println!(
                    "{}: {} inclusões, {} alterações, {} excluídos",
                    summary.kind, summary.inserts, summary.updates, summary.deleted
                );
                break;
            }
            UploadOutcome::ConflictPending(conflict) => {
                println!("Período {} já importado.", conflict.period_ref);
                let password = prompt_password("Senha para substituir:")?;
                match pipeline.confirm_conflict(&password).await? {
                    ConflictOutcome::Committed(summary) => {
                        outcome = UploadOutcome::Committed(summary);
                    }
                    ConflictOutcome::Retry { .. } => {
                        if let Some(message) = pipeline.session().messages.latest() {
                            println!("  {}", message.text);
                        }
                        let conflict = pipeline
                            .session()
                            .conflict
                            .clone()
                            .context("conflito descartado")?;
                        outcome = UploadOutcome::ConflictPending(conflict);
                    }
                    ConflictOutcome::Aborted => bail!("importação abortada"),
                }
            }
        }
    }
    Ok(())
}

async fn run_delete(
    state: &AppState,
    kind: RecordKind,
    target: TargetPeriod,
    user: &SessionUser,
) -> Result<()> {
    if !user.has_permission(DELETE_PERMISSION) {
        bail!("usuário {} sem permissão '{}'", user.id, DELETE_PERMISSION);
    }
    let pipeline = state.import_pipeline();
    let mut flow = pipeline.begin_period_delete(kind, target);
    println!("Excluir {} {}", kind.collection(), flow.target().reference_label());
    loop {
        let password = prompt_password("Senha:")?;
        match flow.confirm(&password, user).await? {
            DeleteOutcome::Deleted {
                count,
                history_error,
            } => {
                println!("{} registros excluídos", count);
                if let Some(e) = history_error {
                    eprintln!("histórico não registrado: {}", e);
                }
                return Ok(());
            }
            DeleteOutcome::Rejected { remaining, .. } => {
                println!("Senha inválida. Tentativas restantes: {}", remaining);
            }
            DeleteOutcome::Aborted => bail!("número máximo de tentativas excedido"),
        }
    }
}

async fn run_history(state: &AppState, search: Option<&str>, page: usize) -> Result<()> {
    state.history.refresh().await?;
    let page = state
        .history
        .page(search, page, state.settings.history_page_size)
        .await;
    for entry in &page.items {
        println!(
            "{:>14}  {}  {:<10} {:<28} {:<24} {}",
            entry.id,
            entry.timestamp.format("%d/%m/%Y %H:%M"),
            entry.action,
            entry.table_label,
            entry.file_name,
            entry.user
        );
    }
    println!("página {}/{} ({} registros)", page.page, page.total_pages, page.total);
    Ok(())
}

fn run_config(state: &AppState, set: Option<Vec<String>>) -> Result<()> {
    if let Some(pair) = set {
        if let [key, value] = pair.as_slice() {
            state.config.set_global_config_value(key, value)?;
        }
    }
    for (key, value) in state.config.get_config_snapshot()? {
        println!("{} = {}", key, value);
    }
    Ok(())
}
