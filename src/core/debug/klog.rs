//! Sink do log do kernel.
//!
//! Os macros de `core::logging` escrevem aqui byte a byte. A saída fica num
//! anel de tamanho fixo protegido por spinlock; quem tiver um console (serial,
//! framebuffer, harness de teste) drena o conteúdo com [`snapshot`].
//!
//! Sem `core::fmt` e sem alocação: apenas strings literais e hex manual.

use spin::Mutex;

/// Capacidade do anel em bytes. Ao encher, os bytes mais antigos são perdidos.
pub const KLOG_CAPACITY: usize = 16 * 1024;

struct LogRing {
    buf: [u8; KLOG_CAPACITY],
    head: usize,
    len: usize,
}

impl LogRing {
    const fn new() -> Self {
        Self {
            buf: [0; KLOG_CAPACITY],
            head: 0,
            len: 0,
        }
    }

    #[inline]
    fn push(&mut self, byte: u8) {
        let tail = (self.head + self.len) % KLOG_CAPACITY;
        self.buf[tail] = byte;
        if self.len == KLOG_CAPACITY {
            self.head = (self.head + 1) % KLOG_CAPACITY;
        } else {
            self.len += 1;
        }
    }

    fn push_hex(&mut self, value: u64) {
        self.push(b'0');
        self.push(b'x');
        for shift in (0..16).rev() {
            self.push(nibble_to_ascii(((value >> (shift * 4)) & 0xF) as u8));
        }
    }

    /// Copia os `out.len()` bytes mais recentes, do mais antigo ao mais novo.
    fn copy_recent(&self, out: &mut [u8]) -> usize {
        let n = out.len().min(self.len);
        let skip = self.len - n;
        for (i, slot) in out.iter_mut().take(n).enumerate() {
            *slot = self.buf[(self.head + skip + i) % KLOG_CAPACITY];
        }
        n
    }
}

static KLOG: Mutex<LogRing> = Mutex::new(LogRing::new());

#[inline]
fn nibble_to_ascii(n: u8) -> u8 {
    match n {
        0..=9 => b'0' + n,
        _ => b'a' + (n - 10),
    }
}

/// Emite um byte.
pub fn emit(byte: u8) {
    KLOG.lock().push(byte);
}

/// Emite uma string inteira sob um único lock.
pub fn emit_str(s: &str) {
    let mut ring = KLOG.lock();
    for &b in s.as_bytes() {
        ring.push(b);
    }
}

/// Emite `0x` seguido de 16 dígitos hex.
pub fn emit_hex(value: u64) {
    KLOG.lock().push_hex(value);
}

pub fn emit_nl() {
    emit(b'\n');
}

/// Copia o final do log para `out`. Retorna quantos bytes foram escritos.
pub fn snapshot(out: &mut [u8]) -> usize {
    KLOG.lock().copy_recent(out)
}

/// Bytes atualmente retidos no anel.
pub fn len() -> usize {
    KLOG.lock().len
}

pub fn clear() {
    let mut ring = KLOG.lock();
    ring.head = 0;
    ring.len = 0;
}
