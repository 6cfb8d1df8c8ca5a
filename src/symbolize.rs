//! Instruction-pointer symbolization via DWARF debug info
//!
//! Maps recorded call sites to demangled function names and line numbers
//! using the current executable's `.debug_line`/`.debug_info` sections. The
//! engine treats this as a pure lookup oracle: a missing or unreadable DWARF
//! context degrades the location column to placeholder strings and never
//! fails the analysis.

use std::borrow::Cow;
use std::fs::File;

use anyhow::{Context as _, Result};
use object::{Object, ObjectSection};

type DwarfReader = gimli::EndianRcSlice<gimli::RunTimeEndian>;

/// A resolved call-site location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLocation {
    /// Demangled function name.
    pub function: String,
    /// Line number; 0 if unknown.
    pub line: u32,
}

/// DWARF lookup oracle over the running executable.
pub struct Symbolizer {
    context: Option<addr2line::Context<DwarfReader>>,
    errmsg: Option<String>,
}

impl Symbolizer {
    /// Load DWARF data for the current executable. Failures are captured as
    /// a sticky error message; the symbolizer stays usable (and degraded).
    pub fn for_current_exe() -> Self {
        match Self::load_current_exe() {
            Ok(context) => Self {
                context: Some(context),
                errmsg: None,
            },
            Err(err) => Self {
                context: None,
                errmsg: Some(format!(
                    "warning: failed to load debug info for symbolization. {err:#}\n\
                     info: recompiling the target with debug information (-g) may fix this"
                )),
            },
        }
    }

    /// A symbolizer with no DWARF context; every lookup degrades.
    pub fn disabled() -> Self {
        Self {
            context: None,
            errmsg: None,
        }
    }

    fn load_current_exe() -> Result<addr2line::Context<DwarfReader>> {
        let exe_path = std::env::current_exe().context("failed to resolve current executable")?;
        let file = File::open(&exe_path)
            .with_context(|| format!("failed to open {}", exe_path.display()))?;
        let mmap = unsafe { memmap2::Mmap::map(&file) }.context("failed to map executable")?;
        let object = object::File::parse(&*mmap).context("failed to parse executable")?;

        let endian = if object.is_little_endian() {
            gimli::RunTimeEndian::Little
        } else {
            gimli::RunTimeEndian::Big
        };

        let load_section = |id: gimli::SectionId| -> Result<DwarfReader, gimli::Error> {
            let data = object
                .section_by_name(id.name())
                .and_then(|section| section.uncompressed_data().ok())
                .unwrap_or(Cow::Borrowed(&[]));
            let bytes: std::rc::Rc<[u8]> = std::rc::Rc::from(data.into_owned());
            Ok(gimli::EndianRcSlice::new(bytes, endian))
        };

        let dwarf = gimli::Dwarf::load(&load_section).context("failed to load DWARF sections")?;
        addr2line::Context::from_dwarf(dwarf).context("failed to build DWARF context")
    }

    /// True when a DWARF context is available for lookups.
    pub fn is_valid(&self) -> bool {
        self.context.is_some()
    }

    /// Sticky error message describing why symbolization is degraded.
    pub fn errmsg(&self) -> Option<&str> {
        self.errmsg.as_deref()
    }

    /// Resolve an instruction pointer to a demangled name and line number.
    /// Returns `None` when the address does not resolve to known code.
    pub fn locate(&self, ip: u64) -> Option<ResolvedLocation> {
        let context = self.context.as_ref()?;

        let frames = context.find_frames(ip).skip_all_loads().ok()?;
        let mut frames = frames;
        let frame = frames.next().ok()??;
        let function = frame
            .function
            .as_ref()
            .and_then(|name| name.demangle().ok())
            .map(|name| name.to_string())?;

        let line = context
            .find_location(ip)
            .ok()
            .flatten()
            .and_then(|location| location.line)
            .unwrap_or(0);

        Some(ResolvedLocation { function, line })
    }
}

impl std::fmt::Debug for Symbolizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Symbolizer")
            .field("valid", &self.is_valid())
            .field("errmsg", &self.errmsg)
            .finish()
    }
}
