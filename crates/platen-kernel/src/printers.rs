//! The printer registry.
//!
//! A bounded set of named printers, each pinned to exactly one file type.
//! Printers are declared Disabled, enabled to Idle, and flip between Idle and
//! Busy as the scheduler assigns and releases jobs. Printers are never
//! removed, so a `PrinterId` stays valid for the life of the spooler.

use platen_types::{PrinterId, PrinterInfo, PrinterStatus, SpoolError, SpoolResult};

use crate::registry::TypeRegistry;

/// A single logical printer.
#[derive(Debug, Clone)]
pub struct Printer {
    pub name: String,
    pub type_name: String,
    pub status: PrinterStatus,
}

/// Bounded registry of printers.
#[derive(Debug)]
pub struct PrinterRegistry {
    printers: Vec<Printer>,
    capacity: usize,
}

impl PrinterRegistry {
    pub fn new(capacity: usize) -> Self {
        Self { printers: Vec::new(), capacity }
    }

    /// Declare a printer with the given name and (already validated) type.
    /// The new printer starts Disabled.
    pub fn add(&mut self, name: &str, type_name: &str) -> SpoolResult<PrinterId> {
        if self.printers.len() >= self.capacity {
            return Err(SpoolError::PrinterTableFull);
        }
        if self.find_by_name(name).is_some() {
            return Err(SpoolError::DuplicatePrinter(name.to_string()));
        }
        let id = PrinterId(self.printers.len());
        self.printers.push(Printer {
            name: name.to_string(),
            type_name: type_name.to_string(),
            status: PrinterStatus::Disabled,
        });
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.printers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.printers.is_empty()
    }

    pub fn get(&self, id: PrinterId) -> Option<&Printer> {
        self.printers.get(id.0)
    }

    pub fn get_mut(&mut self, id: PrinterId) -> Option<&mut Printer> {
        self.printers.get_mut(id.0)
    }

    /// Linear scan for a printer by name.
    pub fn find_by_name(&self, name: &str) -> Option<(PrinterId, &Printer)> {
        self.printers
            .iter()
            .enumerate()
            .find(|(_, p)| p.name == name)
            .map(|(i, p)| (PrinterId(i), p))
    }

    pub fn infos(&self) -> Vec<PrinterInfo> {
        self.printers
            .iter()
            .enumerate()
            .map(|(i, p)| PrinterInfo {
                id: PrinterId(i),
                name: p.name.clone(),
                type_name: p.type_name.clone(),
                status: p.status,
            })
            .collect()
    }

    /// Select an Idle printer compatible with `from_type`.
    ///
    /// Two passes in registry insertion order: a printer whose type equals
    /// `from_type` is preferred over one that is only reachable through the
    /// conversion graph, regardless of declaration order.
    pub fn select_compatible(
        &self,
        from_type: &str,
        types: &TypeRegistry,
    ) -> Option<PrinterId> {
        if let Some((i, _)) = self
            .printers
            .iter()
            .enumerate()
            .find(|(_, p)| p.status == PrinterStatus::Idle && p.type_name == from_type)
        {
            return Some(PrinterId(i));
        }

        self.printers
            .iter()
            .enumerate()
            .find(|(_, p)| {
                p.status == PrinterStatus::Idle
                    && types.find_path(from_type, &p.type_name).is_some()
            })
            .map(|(i, _)| PrinterId(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types_with(pairs: &[(&str, &str)], names: &[&str]) -> TypeRegistry {
        let mut t = TypeRegistry::new();
        for n in names {
            t.declare_type(n);
        }
        for (from, to) in pairs {
            t.declare_conversion(from, to, vec!["conv".to_string()]).unwrap();
        }
        t
    }

    #[test]
    fn add_rejects_duplicate_names() {
        let mut r = PrinterRegistry::new(4);
        r.add("alice", "pdf").unwrap();
        let err = r.add("alice", "txt").unwrap_err();
        assert_eq!(err, SpoolError::DuplicatePrinter("alice".to_string()));
    }

    #[test]
    fn add_rejects_when_full() {
        let mut r = PrinterRegistry::new(1);
        r.add("alice", "pdf").unwrap();
        assert_eq!(r.add("bob", "pdf").unwrap_err(), SpoolError::PrinterTableFull);
    }

    #[test]
    fn new_printers_start_disabled() {
        let mut r = PrinterRegistry::new(4);
        let id = r.add("alice", "pdf").unwrap();
        assert_eq!(r.get(id).unwrap().status, PrinterStatus::Disabled);
    }

    #[test]
    fn select_skips_non_idle_printers() {
        let types = types_with(&[], &["pdf"]);
        let mut r = PrinterRegistry::new(4);
        r.add("alice", "pdf").unwrap();
        assert_eq!(r.select_compatible("pdf", &types), None);

        r.get_mut(PrinterId(0)).unwrap().status = PrinterStatus::Idle;
        assert_eq!(r.select_compatible("pdf", &types), Some(PrinterId(0)));
    }

    #[test]
    fn direct_match_preferred_over_earlier_convertible() {
        let types = types_with(&[("pdf", "ps")], &["pdf", "ps"]);
        let mut r = PrinterRegistry::new(4);
        // The convertible printer is declared first; the direct match later.
        r.add("converter", "ps").unwrap();
        r.add("direct", "pdf").unwrap();
        r.get_mut(PrinterId(0)).unwrap().status = PrinterStatus::Idle;
        r.get_mut(PrinterId(1)).unwrap().status = PrinterStatus::Idle;

        assert_eq!(r.select_compatible("pdf", &types), Some(PrinterId(1)));
    }

    #[test]
    fn falls_back_to_conversion_reachable_printer() {
        let types = types_with(&[("pdf", "ps")], &["pdf", "ps"]);
        let mut r = PrinterRegistry::new(4);
        r.add("converter", "ps").unwrap();
        r.get_mut(PrinterId(0)).unwrap().status = PrinterStatus::Idle;

        assert_eq!(r.select_compatible("pdf", &types), Some(PrinterId(0)));
        assert_eq!(r.select_compatible("ps", &types), Some(PrinterId(0)));
        assert_eq!(r.select_compatible("txt", &types), None);
    }
}
