//! Keyboard shortcut registry for the native shell.

/// A control-surface action triggered from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Clear,
    Save,
    Retrieve,
    DeleteSaved,
    StrokeColor(&'static str),
    BackgroundColor(&'static str),
    LineWidth(&'static str),
    ShowHelp,
}

/// A keyboard shortcut definition.
#[derive(Debug, Clone)]
pub struct Shortcut {
    pub key: &'static str,
    pub ctrl: bool,
    pub shift: bool,
    pub description: &'static str,
    pub command: Command,
}

impl Shortcut {
    pub const fn new(
        key: &'static str,
        ctrl: bool,
        shift: bool,
        description: &'static str,
        command: Command,
    ) -> Self {
        Self {
            key,
            ctrl,
            shift,
            description,
            command,
        }
    }

    /// Format the shortcut for display (e.g., "Ctrl+S").
    pub fn format(&self) -> String {
        let mut parts = Vec::new();
        if self.ctrl {
            parts.push("Ctrl");
        }
        if self.shift {
            parts.push("Shift");
        }
        parts.push(self.key);
        parts.join("+")
    }

    fn matches(&self, key: &str, ctrl: bool, shift: bool) -> bool {
        self.key.eq_ignore_ascii_case(key) && self.ctrl == ctrl && self.shift == shift
    }
}

const PALETTE: [(&str, &str, &str); 6] = [
    ("B", "#000000", "black"),
    ("W", "#ffffff", "white"),
    ("R", "#e53935", "red"),
    ("G", "#43a047", "green"),
    ("U", "#1e88e5", "blue"),
    ("Y", "#fdd835", "yellow"),
];

const WIDTHS: [(&str, &str); 9] = [
    ("1", "1"),
    ("2", "2"),
    ("3", "3"),
    ("4", "5"),
    ("5", "8"),
    ("6", "12"),
    ("7", "16"),
    ("8", "24"),
    ("9", "32"),
];

/// Registry of all keyboard shortcuts.
pub struct ShortcutRegistry;

impl ShortcutRegistry {
    /// Get all registered shortcuts.
    pub fn all() -> Vec<Shortcut> {
        let mut shortcuts = vec![
            Shortcut::new("C", false, false, "Clear the canvas", Command::Clear),
            Shortcut::new("S", true, false, "Save and export my-canvas.png", Command::Save),
            Shortcut::new("O", true, false, "Retrieve the saved drawing", Command::Retrieve),
            Shortcut::new("Delete", true, false, "Forget the saved drawing", Command::DeleteSaved),
            Shortcut::new("F1", false, false, "Show keyboard shortcuts", Command::ShowHelp),
        ];
        for (key, color, name) in PALETTE {
            shortcuts.push(Shortcut::new(key, false, false, name, Command::StrokeColor(color)));
            shortcuts.push(Shortcut::new(
                key,
                false,
                true,
                "background",
                Command::BackgroundColor(color),
            ));
        }
        for (key, width) in WIDTHS {
            shortcuts.push(Shortcut::new(key, false, false, "brush width", Command::LineWidth(width)));
        }
        shortcuts
    }

    /// Find the command bound to a key press.
    pub fn lookup(key: &str, ctrl: bool, shift: bool) -> Option<Command> {
        Self::all()
            .into_iter()
            .find(|shortcut| shortcut.matches(key, ctrl, shift))
            .map(|shortcut| shortcut.command)
    }

    /// Print all shortcuts to console.
    pub fn print_all() {
        println!("\n=== Keyboard Shortcuts ===");
        for shortcut in Self::all() {
            let detail = match shortcut.command {
                Command::StrokeColor(color) | Command::BackgroundColor(color) => {
                    format!("{} ({})", shortcut.description, color)
                }
                Command::LineWidth(width) => format!("{} {}", shortcut.description, width),
                _ => shortcut.description.to_string(),
            };
            println!("  {:20} {}", shortcut.format(), detail);
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(ShortcutRegistry::lookup("c", false, false), Some(Command::Clear));
        assert_eq!(ShortcutRegistry::lookup("s", true, false), Some(Command::Save));
        assert_eq!(ShortcutRegistry::lookup("o", true, false), Some(Command::Retrieve));
        assert_eq!(ShortcutRegistry::lookup("s", false, false), None);
        assert_eq!(
            ShortcutRegistry::lookup("Delete", true, false),
            Some(Command::DeleteSaved)
        );
    }

    #[test]
    fn test_shift_selects_background() {
        assert_eq!(
            ShortcutRegistry::lookup("R", false, false),
            Some(Command::StrokeColor("#e53935"))
        );
        assert_eq!(
            ShortcutRegistry::lookup("R", false, true),
            Some(Command::BackgroundColor("#e53935"))
        );
    }

    #[test]
    fn test_width_presets() {
        assert_eq!(ShortcutRegistry::lookup("4", false, false), Some(Command::LineWidth("5")));
        assert_eq!(ShortcutRegistry::lookup("9", false, false), Some(Command::LineWidth("32")));
    }

    #[test]
    fn test_no_duplicate_bindings() {
        let all = ShortcutRegistry::all();
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert!(
                    !(a.key == b.key && a.ctrl == b.ctrl && a.shift == b.shift),
                    "{} bound twice",
                    a.format()
                );
            }
        }
    }

    #[test]
    fn test_format() {
        let shortcut = Shortcut::new("S", true, false, "Save", Command::Save);
        assert_eq!(shortcut.format(), "Ctrl+S");
    }
}
