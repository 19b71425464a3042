//! ANSI color helpers for CLI output.

#[derive(Debug, Clone, Copy)]
pub struct Palette {
    enabled: bool,
}

impl Palette {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    fn paint(&self, code: &str, s: &str) -> String {
        if self.enabled {
            format!("\x1b[{}m{}\x1b[0m", code, s)
        } else {
            s.to_string()
        }
    }

    pub fn green(&self, s: &str) -> String {
        self.paint("32", s)
    }

    pub fn red(&self, s: &str) -> String {
        self.paint("31", s)
    }

    pub fn cyan(&self, s: &str) -> String {
        self.paint("36", s)
    }

    pub fn gray(&self, s: &str) -> String {
        self.paint("90", s)
    }

    /// Right-aligned, green, bold status label.
    pub fn status_label(&self, label: &str) -> String {
        if self.enabled {
            format!("\x1b[1;32m{:>12}\x1b[0m", label)
        } else {
            format!("{:>12}", label)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_palette_is_plain() {
        let p = Palette::new(false);
        assert_eq!(p.red("error:"), "error:");
        assert_eq!(p.status_label("Sealed"), "      Sealed");
    }

    #[test]
    fn enabled_palette_wraps_in_escapes() {
        let p = Palette::new(true);
        assert_eq!(p.green("ok"), "\x1b[32mok\x1b[0m");
    }
}
