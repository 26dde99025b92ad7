/// Arquivo: core/debug/mod.rs
///
/// Propósito: Módulo de diagnóstico.
///
/// Módulos contidos:
/// - `klog`: Anel de bytes que recebe a saída dos macros de logging.

pub mod klog;
