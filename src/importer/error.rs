// ==========================================
// 人事薪资后台 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("Arquivo não encontrado: {0}")]
    FileNotFound(String),

    #[error("Formato não suportado: {0} (apenas .xlsx/.xls/.csv)")]
    UnsupportedFormat(String),

    #[error("Falha ao ler arquivo: {0}")]
    FileReadError(String),

    #[error("Falha ao decodificar Excel: {0}")]
    ExcelParseError(String),

    #[error("Falha ao decodificar CSV: {0}")]
    CsvParseError(String),

    // ===== 校验错误 =====
    #[error("Colunas obrigatórias ausentes: {}", .0.join(", "))]
    MissingHeaders(Vec<String>),

    #[error("{count} linhas com erros de validação")]
    RowValidation { count: usize },

    #[error("Mais de uma competência na planilha: {}", .0.join(", "))]
    MultipleCompetences(Vec<String>),

    // ===== 对账错误 =====
    #[error("Cadastros não encontrados: {}", format_registrations(.0))]
    UnknownRegistrations(Vec<i64>),

    #[error("Nenhum registro válido para importar")]
    NoActionableRows,

    // ===== 流程错误 =====
    #[error("Nenhum arquivo validado para importar")]
    NoPendingBatch,

    #[error("Nenhum conflito de período pendente")]
    NoPendingConflict,

    #[error("Número máximo de tentativas de senha excedido")]
    PasswordAttemptsExhausted,

    #[error("Usuário da sessão indisponível")]
    NoSessionUser,

    #[error("Permissão necessária: {0}")]
    PermissionDenied(String),

    #[error("Transição inválida: {0}")]
    InvalidState(String),

    // ===== 仓储错误 =====
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn format_registrations(list: &[i64]) -> String {
    list.iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
