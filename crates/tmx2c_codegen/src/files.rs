//! Cross-file symbol resolution
//!
//! Emitters write into a single draft at a time. While drafting they record
//! which symbols the draft defines and which it requires; [`FileManager::commit`]
//! freezes the draft under a path. [`FileManager::finalize`] then turns every
//! requirement into an `#include` of the committed file defining it.
//!
//! A draft moves through three states:
//!
//! 1. [`Draft`] - text and symbol sets still being built
//! 2. [`CommittedFile`] - frozen, waiting for resolution
//! 3. [`GeneratedFile`] - final contents with concrete includes

use indexmap::IndexSet;
use tracing::{debug, info, warn};

use crate::stream::{CodeStream, Writer};
use crate::{header_guard, relative_include, CodegenError};

/// A fully resolved output file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// Relative to the output directory, `/`-separated
    pub path: String,
    pub contents: String,
}

impl GeneratedFile {
    pub fn is_header(&self) -> bool {
        is_header(&self.path)
    }
}

/// The draft currently receiving text
#[derive(Debug, Default)]
struct Draft {
    stream: CodeStream,
    requires: IndexSet<String>,
    defines: IndexSet<String>,
}

/// A frozen draft awaiting resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedFile {
    pub path: String,
    pub body: String,
    /// Symbols in order of first use
    pub requires: IndexSet<String>,
    pub defines: IndexSet<String>,
}

/// Tracks drafts and resolves the includes between them
#[derive(Debug, Default)]
pub struct FileManager {
    draft: Draft,
    committed: Vec<CommittedFile>,
}

impl FileManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the current draft needs `name`
    ///
    /// Names written as `<header.h>` are system headers and are included as
    /// they are.
    pub fn require<'n>(&mut self, name: &'n str) -> &'n str {
        if !self.draft.requires.contains(name) {
            self.draft.requires.insert(name.to_string());
        }
        name
    }

    /// Record that the current draft introduces `name`
    pub fn define<'n>(&mut self, name: &'n str) -> &'n str {
        if !self.draft.defines.contains(name) {
            self.draft.defines.insert(name.to_string());
        }
        name
    }

    /// Freeze the current draft under `path` and start a new one
    pub fn commit(&mut self, path: impl Into<String>) {
        let draft = std::mem::take(&mut self.draft);
        let mut stream = draft.stream;
        let file = CommittedFile {
            path: path.into(),
            body: stream.take(),
            requires: draft.requires,
            defines: draft.defines,
        };
        debug!(
            path = %file.path,
            requires = file.requires.len(),
            defines = file.defines.len(),
            "committed draft"
        );
        self.committed.push(file);
    }

    /// Files committed since the last [`FileManager::finalize`]
    pub fn pending(&self) -> &[CommittedFile] {
        &self.committed
    }

    /// Resolve every committed file and drain the pending list
    ///
    /// A required symbol is satisfied by a system include, by the file
    /// itself, or by exactly one other committed file. When several files
    /// define it the last one wins. A symbol nobody defines fails the whole
    /// batch and no file is returned.
    pub fn finalize(&mut self) -> Result<Vec<GeneratedFile>, CodegenError> {
        let committed = std::mem::take(&mut self.committed);
        let mut files = Vec::with_capacity(committed.len());

        for (index, file) in committed.iter().enumerate() {
            let mut includes: IndexSet<String> = IndexSet::new();

            for symbol in &file.requires {
                if is_system_header(symbol) {
                    includes.insert(format!("#include {symbol}"));
                    continue;
                }
                if file.defines.contains(symbol) {
                    continue;
                }

                let providers: Vec<&CommittedFile> = committed
                    .iter()
                    .enumerate()
                    .filter(|(other, candidate)| {
                        *other != index && candidate.defines.contains(symbol)
                    })
                    .map(|(_, candidate)| candidate)
                    .collect();

                let Some(provider) = providers.last() else {
                    return Err(CodegenError::UnresolvedSymbol {
                        file: file.path.clone(),
                        symbol: symbol.clone(),
                    });
                };
                if providers.len() > 1 {
                    warn!(
                        symbol = %symbol,
                        file = %file.path,
                        chosen = %provider.path,
                        candidates = providers.len(),
                        "symbol defined by several files"
                    );
                }

                includes.insert(format!(
                    "#include \"{}\"",
                    relative_include(&file.path, &provider.path)
                ));
            }

            files.push(render(file, &includes));
        }

        info!(files = files.len(), "resolved generated files");
        Ok(files)
    }
}

impl Writer for FileManager {
    fn stream(&mut self) -> &mut CodeStream {
        &mut self.draft.stream
    }
}

fn render(file: &CommittedFile, includes: &IndexSet<String>) -> GeneratedFile {
    let mut cs = CodeStream::new();
    let header = is_header(&file.path);
    let guard = header_guard(&file.path);

    if header {
        cs.write(&format!("#ifndef {guard}\n"));
        cs.write(&format!("#define {guard}\n\n"));
    }

    for include in includes {
        cs.write(include);
        cs.write("\n");
    }
    if !includes.is_empty() {
        cs.write("\n");
    }

    if header {
        cs.write("#ifdef __cplusplus\n");
        cs.write("extern \"C\" {\n");
        cs.write("#endif // __cplusplus\n\n");
    }

    cs.append(&file.body);

    if header {
        cs.write("\n#ifdef __cplusplus\n");
        cs.write("}\n");
        cs.write("#endif // __cplusplus\n\n");
        cs.write(&format!("#endif // {guard}\n"));
    }

    GeneratedFile {
        path: file.path.clone(),
        contents: cs.take(),
    }
}

fn is_system_header(symbol: &str) -> bool {
    symbol.starts_with('<') && symbol.ends_with('>')
}

fn is_header(path: &str) -> bool {
    path.ends_with(".h")
}
