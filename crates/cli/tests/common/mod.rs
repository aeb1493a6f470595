#![allow(dead_code)]

use std::path::{Path, PathBuf};

use object::write::{Object, Symbol, SymbolSection};
use object::{
    Architecture, BinaryFormat, Endianness, SectionKind, SymbolFlags, SymbolKind, SymbolScope,
};
use stackcheck_core::scenario::{CaptureSet, ProbeCapture, ScenarioSuite};
use stackcheck_core::{CapturedStack, NamedRange, RangeRegistry};

pub const RANGES_YAML: &str = r#"
caller: { name: uretprobe_stack_sec, start: "0x401000", stop: "0x401100" }
targets:
  - { name: target_1, start: "0x402000", stop: "0x402100" }
  - { name: target_2, start: "0x403000", stop: "0x403100" }
  - { name: target_3, start: "0x404000", stop: "0x404100" }
  - { name: target_4, start: "0x405000", stop: "0x405100" }
"#;

pub fn write_ranges(dir: &Path) -> PathBuf {
    let path = dir.join("ranges.yaml");
    std::fs::write(&path, RANGES_YAML).unwrap();
    path
}

pub fn registry() -> RangeRegistry {
    RangeRegistry::new(
        NamedRange::new("uretprobe_stack_sec", 0x401000, 0x401100),
        vec![
            NamedRange::new("target_1", 0x402000, 0x402100),
            NamedRange::new("target_2", 0x403000, 0x403100),
            NamedRange::new("target_3", 0x404000, 0x404100),
            NamedRange::new("target_4", 0x405000, 0x405100),
        ],
    )
    .unwrap()
}

/// Captures that satisfy the built-in suite, with one libc frame below the caller.
pub fn passing_captures() -> CaptureSet {
    let registry = registry();
    let resolved = ScenarioSuite::uretprobe_stack().resolve(&registry).unwrap();
    let captures = resolved
        .iter()
        .map(|probe| {
            let mut addresses: Vec<u64> =
                probe.chain.frames().iter().map(|r| r.start + 0x10).collect();
            addresses.push(0x7f12_3456_7000);
            ProbeCapture::new(probe.probe.clone(), CapturedStack::from_addresses(addresses))
        })
        .collect();
    CaptureSet { captures }
}

pub fn write_captures(dir: &Path, name: &str, captures: &CaptureSet) -> PathBuf {
    let path = dir.join(name);
    let body = if name.ends_with(".json") {
        serde_json::to_string_pretty(captures).unwrap()
    } else {
        serde_yaml::to_string(captures).unwrap()
    };
    std::fs::write(&path, body).unwrap();
    path
}

/// Relocatable ELF carrying the caller and two target sections' boundary symbols.
pub fn write_elf_image(dir: &Path) -> PathBuf {
    let mut obj = Object::new(BinaryFormat::Elf, Architecture::X86_64, Endianness::Little);
    let text_id = obj.add_section(Vec::new(), b".text".to_vec(), SectionKind::Text);
    obj.section_mut(text_id).append_data(&[0xC3; 0x300], 16);

    let boundaries = [
        ("__start_uretprobe_stack_sec", 0x000),
        ("__stop_uretprobe_stack_sec", 0x100),
        ("__start_uprobe__target_1", 0x100),
        ("__stop_uprobe__target_1", 0x180),
        ("__start_uprobe__target_2", 0x200),
        ("__stop_uprobe__target_2", 0x280),
    ];
    for (name, value) in boundaries {
        obj.add_symbol(Symbol {
            name: name.as_bytes().to_vec(),
            value,
            size: 0,
            kind: SymbolKind::Text,
            scope: SymbolScope::Linkage,
            weak: false,
            section: SymbolSection::Section(text_id),
            flags: SymbolFlags::None,
        });
    }

    let path = dir.join("uretprobe_stack.o");
    std::fs::write(&path, obj.write().unwrap()).unwrap();
    path
}
