//! Tipos de Erro do Subsistema de Memória
//!
//! Erros recuperáveis do VM. Invariantes quebradas (remap, refcount negativo,
//! falha de I/O no swap) não passam por aqui: são `panic!`.

/// Erros do subsistema de memória
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MmError {
    /// Sem memória física disponível (OOM)
    OutOfMemory,
    /// Limite de páginas do processo excedido
    QuotaExceeded,
    /// Container de tamanho fixo (resident set, swap map) cheio
    CapacityExceeded,
    /// Endereço inválido (fora do espaço de usuário)
    InvalidAddress,
    /// Endereço não alinhado a página
    NotAligned,
    /// Região não mapeada
    NotMapped,
    /// Escrita em página somente-leitura que não é COW
    ProtectionViolation,
    /// Page fault que o resolver não soube tratar (`FaultResult::FatalError`)
    FatalError,
}

impl MmError {
    /// Retorna descrição legível do erro
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OutOfMemory => "OOM: sem frames físicos disponíveis",
            Self::QuotaExceeded => "Quota de páginas do processo excedida",
            Self::CapacityExceeded => "Capacidade da tabela excedida",
            Self::InvalidAddress => "Endereço inválido",
            Self::NotAligned => "Endereço não alinhado a página",
            Self::NotMapped => "Região não mapeada",
            Self::ProtectionViolation => "Violação de proteção",
            Self::FatalError => "Page fault não resolvido",
        }
    }
}

impl core::fmt::Display for MmError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tipo Result específico para operações de memória
pub type MmResult<T> = Result<T, MmError>;
