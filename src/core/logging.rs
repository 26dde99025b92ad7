// =============================================================================
// KERNEL LOGGING SYSTEM - ZERO OVERHEAD
// =============================================================================
//
// Logging do Forge VM com custo ZERO quando desabilitado.
//
// ARQUITETURA:
// - Usa features do Cargo para compile-time filtering
// - Com feature "no_logs", TODOS os macros viram expressões vazias
// - SEM core::fmt no caminho de log
// - SEM alocação - Apenas strings e hex
// - Escreve no anel do klog (core::debug::klog)
//
// NÍVEIS DE LOG (do mais crítico ao menos):
// - ERROR: Invariante quebrada ou falha de I/O de swap
// - WARN:  Quota excedida, OOM recuperável
// - INFO:  Criação/destruição de address spaces, fork
// - DEBUG: Evictions, swap-in, resolução de COW
// - TRACE: Cada página mapeada/desmapeada
//
// FEATURES:
// - no_logs:   Remove 100% dos logs
// - log_error: ERROR e WARN
// - log_info:  + INFO
// - log_debug: + DEBUG
// - log_trace: Todos os níveis (padrão)
//
// COMO USAR:
//   kinfo!("(ASPACE) Criado");                 // Apenas string
//   kdebug!("(EVICT) va=", va.as_u64());       // String + hex
//   klog!("Slot=", slot, " Off=", offset);     // Múltiplos valores
//
// =============================================================================

// =============================================================================
// PREFIXOS
// =============================================================================

pub const P_ERROR: &str = "[ERRO] ";
pub const P_WARN: &str = "[WARN] ";
pub const P_INFO: &str = "[INFO] ";
pub const P_DEBUG: &str = "[DEBG] ";
pub const P_TRACE: &str = "[TRAC] ";

// =============================================================================
// MACROS DE LOG - NÍVEL ERROR
// =============================================================================

#[cfg(not(feature = "no_logs"))]
#[macro_export]
macro_rules! kerror {
    ($msg:expr) => {{
        $crate::core::debug::klog::emit_str($crate::core::logging::P_ERROR);
        $crate::core::debug::klog::emit_str($msg);
        $crate::core::debug::klog::emit_nl();
    }};
    ($msg:expr, $val:expr) => {{
        $crate::core::debug::klog::emit_str($crate::core::logging::P_ERROR);
        $crate::core::debug::klog::emit_str($msg);
        $crate::core::debug::klog::emit_hex($val as u64);
        $crate::core::debug::klog::emit_nl();
    }};
}

#[cfg(feature = "no_logs")]
#[macro_export]
macro_rules! kerror {
    ($($t:tt)*) => {{}};
}

// =============================================================================
// MACROS DE LOG - NÍVEL WARN
// =============================================================================

#[cfg(not(feature = "no_logs"))]
#[macro_export]
macro_rules! kwarn {
    ($msg:expr) => {{
        $crate::core::debug::klog::emit_str($crate::core::logging::P_WARN);
        $crate::core::debug::klog::emit_str($msg);
        $crate::core::debug::klog::emit_nl();
    }};
    ($msg:expr, $val:expr) => {{
        $crate::core::debug::klog::emit_str($crate::core::logging::P_WARN);
        $crate::core::debug::klog::emit_str($msg);
        $crate::core::debug::klog::emit_hex($val as u64);
        $crate::core::debug::klog::emit_nl();
    }};
}

#[cfg(feature = "no_logs")]
#[macro_export]
macro_rules! kwarn {
    ($($t:tt)*) => {{}};
}

// =============================================================================
// MACROS DE LOG - NÍVEL INFO
// =============================================================================

#[cfg(not(any(feature = "no_logs", feature = "log_error")))]
#[macro_export]
macro_rules! kinfo {
    ($msg:expr) => {{
        $crate::core::debug::klog::emit_str($crate::core::logging::P_INFO);
        $crate::core::debug::klog::emit_str($msg);
        $crate::core::debug::klog::emit_nl();
    }};
    ($msg:expr, $val:expr) => {{
        $crate::core::debug::klog::emit_str($crate::core::logging::P_INFO);
        $crate::core::debug::klog::emit_str($msg);
        $crate::core::debug::klog::emit_hex($val as u64);
        $crate::core::debug::klog::emit_nl();
    }};
}

#[cfg(any(feature = "no_logs", feature = "log_error"))]
#[macro_export]
macro_rules! kinfo {
    ($($t:tt)*) => {{}};
}

// =============================================================================
// MACROS DE LOG - NÍVEL DEBUG
// =============================================================================
//
// kdebug! - Ativo com log_trace ou log_debug
//

#[cfg(any(feature = "log_trace", feature = "log_debug"))]
#[macro_export]
macro_rules! kdebug {
    ($msg:expr) => {{
        $crate::core::debug::klog::emit_str($crate::core::logging::P_DEBUG);
        $crate::core::debug::klog::emit_str($msg);
        $crate::core::debug::klog::emit_nl();
    }};
    ($msg:expr, $val:expr) => {{
        $crate::core::debug::klog::emit_str($crate::core::logging::P_DEBUG);
        $crate::core::debug::klog::emit_str($msg);
        $crate::core::debug::klog::emit_hex($val as u64);
        $crate::core::debug::klog::emit_nl();
    }};
}

#[cfg(not(any(feature = "log_trace", feature = "log_debug")))]
#[macro_export]
macro_rules! kdebug {
    ($($t:tt)*) => {{}};
}

// =============================================================================
// MACROS DE LOG - NÍVEL TRACE
// =============================================================================

#[cfg(feature = "log_trace")]
#[macro_export]
macro_rules! ktrace {
    ($msg:expr) => {{
        $crate::core::debug::klog::emit_str($crate::core::logging::P_TRACE);
        $crate::core::debug::klog::emit_str($msg);
        $crate::core::debug::klog::emit_nl();
    }};
    ($msg:expr, $val:expr) => {{
        $crate::core::debug::klog::emit_str($crate::core::logging::P_TRACE);
        $crate::core::debug::klog::emit_str($msg);
        $crate::core::debug::klog::emit_hex($val as u64);
        $crate::core::debug::klog::emit_nl();
    }};
}

#[cfg(not(feature = "log_trace"))]
#[macro_export]
macro_rules! ktrace {
    ($($t:tt)*) => {{}};
}

// =============================================================================
// MACROS AUXILIARES
// =============================================================================

/// klog! - Log genérico sem prefixo de nível.
///
/// # Uso
/// ```rust
/// klog!("Addr=", addr);                    // String + hex
/// klog!("Start=", start, " End=", end);    // Múltiplos
/// ```
#[cfg(not(feature = "no_logs"))]
#[macro_export]
macro_rules! klog {
    ($msg:expr) => {{
        $crate::core::debug::klog::emit_str($msg);
    }};
    ($msg:expr, $val:expr) => {{
        $crate::core::debug::klog::emit_str($msg);
        $crate::core::debug::klog::emit_hex($val as u64);
    }};
    ($msg1:expr, $val:expr, $msg2:expr) => {{
        $crate::core::debug::klog::emit_str($msg1);
        $crate::core::debug::klog::emit_hex($val as u64);
        $crate::core::debug::klog::emit_str($msg2);
    }};
    ($msg1:expr, $val1:expr, $msg2:expr, $val2:expr) => {{
        $crate::core::debug::klog::emit_str($msg1);
        $crate::core::debug::klog::emit_hex($val1 as u64);
        $crate::core::debug::klog::emit_str($msg2);
        $crate::core::debug::klog::emit_hex($val2 as u64);
    }};
}

#[cfg(feature = "no_logs")]
#[macro_export]
macro_rules! klog {
    ($($t:tt)*) => {{}};
}

/// knl! - Emite apenas newline.
#[cfg(not(feature = "no_logs"))]
#[macro_export]
macro_rules! knl {
    () => {{
        $crate::core::debug::klog::emit_nl();
    }};
}

#[cfg(feature = "no_logs")]
#[macro_export]
macro_rules! knl {
    () => {{}};
}

// =============================================================================
// MACROS DE STATUS (OK/FAIL)
// =============================================================================

/// kok! - Log de sucesso.
#[cfg(not(feature = "no_logs"))]
#[macro_export]
macro_rules! kok {
    ($msg:expr) => {{
        $crate::core::debug::klog::emit_str("[OK] ");
        $crate::core::debug::klog::emit_str($msg);
        $crate::core::debug::klog::emit_nl();
    }};
}

#[cfg(feature = "no_logs")]
#[macro_export]
macro_rules! kok {
    ($($t:tt)*) => {{}};
}

/// kfail! - Log de falha.
#[cfg(not(feature = "no_logs"))]
#[macro_export]
macro_rules! kfail {
    ($msg:expr) => {{
        $crate::core::debug::klog::emit_str("[FAIL] ");
        $crate::core::debug::klog::emit_str($msg);
        $crate::core::debug::klog::emit_nl();
    }};
}

#[cfg(feature = "no_logs")]
#[macro_export]
macro_rules! kfail {
    ($($t:tt)*) => {{}};
}
