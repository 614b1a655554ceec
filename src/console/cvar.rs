//! Console variables

use std::fmt;

use log::{info, warn};

use super::registry::{NameRegistry, RegistryError};
use crate::hash::name_hash;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CvarFlags {
    /// Written out by `write_variables`
    pub archive: bool,
    /// Changes are announced
    pub server: bool,
}

impl CvarFlags {
    pub const NONE: Self = Self {
        archive: false,
        server: false,
    };
    pub const ARCHIVE: Self = Self {
        archive: true,
        server: false,
    };
    pub const SERVER: Self = Self {
        archive: false,
        server: true,
    };
}

/// Static cvar declaration, collected at start-up.
///
/// ```ignore
/// inventory::submit! { CvarRegistration::new("r_subdivide", "2", CvarFlags::ARCHIVE) }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct CvarRegistration {
    pub name: &'static str,
    pub default: &'static str,
    pub flags: CvarFlags,
}

impl CvarRegistration {
    pub const fn new(name: &'static str, default: &'static str, flags: CvarFlags) -> Self {
        Self {
            name,
            default,
            flags,
        }
    }
}

inventory::collect!(CvarRegistration);

/// Numeric prefix of `text`, 0 when there is none.
fn parse_value(text: &str) -> f32 {
    let text = text.trim();
    if let Ok(value) = text.parse() {
        return value;
    }
    let mut seen_dot = false;
    let end = text
        .char_indices()
        .take_while(|&(i, c)| match c {
            '0'..='9' => true,
            '.' if !seen_dot => {
                seen_dot = true;
                true
            }
            '-' | '+' => i == 0,
            _ => false,
        })
        .last()
        .map_or(0, |(i, c)| i + c.len_utf8());
    text[..end].parse().unwrap_or(0.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cvar {
    name: String,
    string: String,
    value: f32,
    flags: CvarFlags,
}

impl Cvar {
    pub fn new(name: impl Into<String>, value: &str, flags: CvarFlags) -> Self {
        Self {
            name: name.into(),
            string: value.to_string(),
            value: parse_value(value),
            flags,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn string(&self) -> &str {
        &self.string
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn flags(&self) -> CvarFlags {
        self.flags
    }

    /// Returns whether the string changed.
    pub fn set(&mut self, value: &str) -> bool {
        let changed = self.string != value;
        self.string = value.to_string();
        self.value = parse_value(value);
        if self.flags.server && changed {
            info!("\"{}\" changed to \"{}\"", self.name, self.string);
        }
        changed
    }
}

impl fmt::Display for Cvar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} \"{}\"", self.name, self.string)
    }
}

/// Static cvars in a hash-sorted registry, runtime ones in a short list.
#[derive(Debug, Clone, Default)]
pub struct CvarRegistry {
    statics: NameRegistry<Cvar>,
    dynamic: Vec<(u32, Cvar)>,
}

impl CvarRegistry {
    pub fn from_registrations<'a>(
        registrations: impl IntoIterator<Item = &'a CvarRegistration>,
    ) -> Result<Self, RegistryError> {
        let mut statics = NameRegistry::new();
        for reg in registrations {
            statics.register(reg.name, Cvar::new(reg.name, reg.default, reg.flags));
        }
        statics.init()?;
        Ok(Self {
            statics,
            dynamic: Vec::new(),
        })
    }

    /// Add a cvar at runtime.
    pub fn register(&mut self, name: &str, value: &str, flags: CvarFlags) -> Result<(), RegistryError> {
        let hash = name_hash(name);
        if self.find(hash).is_some() {
            warn!("Can't register variable {}, already defined", name);
            return Err(RegistryError::AlreadyDefined {
                name: name.to_string(),
            });
        }
        self.dynamic.push((hash, Cvar::new(name, value, flags)));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.statics.len() + self.dynamic.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn find(&self, hash: u32) -> Option<&Cvar> {
        self.statics.find(hash).or_else(|| {
            self.dynamic
                .iter()
                .find(|(h, _)| *h == hash)
                .map(|(_, cvar)| cvar)
        })
    }

    pub fn find_mut(&mut self, hash: u32) -> Option<&mut Cvar> {
        if let Some(cvar) = self.statics.find_mut(hash) {
            return Some(cvar);
        }
        self.dynamic
            .iter_mut()
            .find(|(h, _)| *h == hash)
            .map(|(_, cvar)| cvar)
    }

    pub fn get(&self, name: &str) -> Option<&Cvar> {
        self.find(name_hash(name))
    }

    /// Numeric value, 0 for unknown names.
    pub fn value(&self, name: &str) -> f32 {
        self.get(name).map_or(0.0, Cvar::value)
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        self.get(name).map(Cvar::string)
    }

    /// Returns false (with a warning) when the variable does not exist.
    pub fn set(&mut self, name: &str, value: &str) -> bool {
        match self.find_mut(name_hash(name)) {
            Some(cvar) => {
                cvar.set(value);
                true
            }
            None => {
                warn!("Cvar_Set: variable {} not found", name);
                false
            }
        }
    }

    pub fn set_value(&mut self, name: &str, value: f32) -> bool {
        self.set(name, &value.to_string())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cvar> {
        self.statics
            .iter()
            .map(|entry| &entry.payload)
            .chain(self.dynamic.iter().map(|(_, cvar)| cvar))
    }

    /// One `name "value"` line per archived variable.
    pub fn write_variables(&self, out: &mut impl fmt::Write) -> fmt::Result {
        for cvar in self.iter().filter(|cvar| cvar.flags.archive) {
            writeln!(out, "{}", cvar)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGS: [CvarRegistration; 3] = [
        CvarRegistration::new("r_subdivide", "2", CvarFlags::ARCHIVE),
        CvarRegistration::new("sv_gravity", "800", CvarFlags::SERVER),
        CvarRegistration::new("developer", "0", CvarFlags::NONE),
    ];

    fn registry() -> CvarRegistry {
        CvarRegistry::from_registrations(REGS.iter()).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cvars = registry();
        assert_eq!(cvars.len(), 3);
        assert_eq!(cvars.value("r_subdivide"), 2.0);
        assert_eq!(cvars.string("sv_gravity"), Some("800"));
        assert_eq!(cvars.value("missing"), 0.0);
    }

    #[test]
    fn test_set_and_set_value() {
        let mut cvars = registry();
        assert!(cvars.set("developer", "1"));
        assert_eq!(cvars.value("developer"), 1.0);
        assert!(cvars.set_value("sv_gravity", 400.5));
        assert_eq!(cvars.string("sv_gravity"), Some("400.5"));
        assert!(!cvars.set("nope", "1"));
    }

    #[test]
    fn test_numeric_prefix() {
        assert_eq!(parse_value("3.5"), 3.5);
        assert_eq!(parse_value("12abc"), 12.0);
        assert_eq!(parse_value("-4x"), -4.0);
        assert_eq!(parse_value("1.5.3"), 1.5);
        assert_eq!(parse_value("-2.25.1"), -2.25);
        assert_eq!(parse_value("on"), 0.0);
        assert_eq!(parse_value(""), 0.0);
    }

    #[test]
    fn test_set_reports_change() {
        let mut cvar = Cvar::new("volume", "0.7", CvarFlags::ARCHIVE);
        assert!(!cvar.set("0.7"));
        assert!(cvar.set("0.5"));
        assert_eq!(cvar.value(), 0.5);
    }

    #[test]
    fn test_dynamic_registration() {
        let mut cvars = registry();
        cvars.register("cl_name", "player", CvarFlags::ARCHIVE).unwrap();
        assert_eq!(cvars.string("cl_name"), Some("player"));
        assert_eq!(
            cvars.register("r_subdivide", "4", CvarFlags::NONE),
            Err(RegistryError::AlreadyDefined {
                name: "r_subdivide".to_string()
            })
        );
        assert!(cvars.set("cl_name", "ranger"));
        assert_eq!(cvars.string("cl_name"), Some("ranger"));
    }

    #[test]
    fn test_write_variables_only_archived() {
        let mut cvars = registry();
        cvars.register("cl_name", "player", CvarFlags::ARCHIVE).unwrap();
        let mut out = String::new();
        cvars.write_variables(&mut out).unwrap();
        let mut lines: Vec<_> = out.lines().collect();
        lines.sort();
        assert_eq!(lines, ["cl_name \"player\"", "r_subdivide \"2\""]);
    }

    #[test]
    fn test_duplicate_static_rejected() {
        let regs = [REGS[0], REGS[0]];
        assert!(matches!(
            CvarRegistry::from_registrations(regs.iter()),
            Err(RegistryError::DuplicateHash { .. })
        ));
    }
}
