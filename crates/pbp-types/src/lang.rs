use std::path::Path;

/// Language tags used when presenting file content.
///
/// The tag is what ends up after the opening fence of a markdown code
/// block, so it follows the common highlighter names rather than the
/// language's marketing name.
///
/// ```text
/// ┌────────────┬────────────────────────────────────┬─────────────┐
/// │ Variant    │ Extensions                         │ Tag         │
/// ├────────────┼────────────────────────────────────┼─────────────┤
/// │ Rust       │ rs                                 │ rust        │
/// │ TypeScript │ ts tsx mts cts                     │ typescript  │
/// │ JavaScript │ js jsx mjs cjs                     │ javascript  │
/// │ Python     │ py pyi pyw                         │ python      │
/// │ Go         │ go                                 │ go          │
/// │ Java       │ java                               │ java        │
/// │ C          │ c h                                │ c           │
/// │ Cpp        │ cc cpp cxx hpp hh hxx              │ cpp         │
/// │ Ruby       │ rb                                 │ ruby        │
/// │ Shell      │ sh bash zsh                        │ bash        │
/// │ Sql        │ sql                                │ sql         │
/// │ Html       │ html htm                           │ html        │
/// │ Css        │ css scss                           │ css         │
/// │ Json       │ json                               │ json        │
/// │ Yaml       │ yml yaml                           │ yaml        │
/// │ Toml       │ toml                               │ toml        │
/// │ Markdown   │ md markdown                        │ markdown    │
/// │ Diff       │ diff patch                         │ diff        │
/// │ Text       │ anything else                      │ text        │
/// └────────────┴────────────────────────────────────┴─────────────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Lang {
  Rust,
  TypeScript,
  JavaScript,
  Python,
  Go,
  Java,
  C,
  Cpp,
  Ruby,
  Shell,
  Sql,
  Html,
  Css,
  Json,
  Yaml,
  Toml,
  Markdown,
  Diff,
  Text,
}

impl Lang {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Rust => "rust",
      Self::TypeScript => "typescript",
      Self::JavaScript => "javascript",
      Self::Python => "python",
      Self::Go => "go",
      Self::Java => "java",
      Self::C => "c",
      Self::Cpp => "cpp",
      Self::Ruby => "ruby",
      Self::Shell => "bash",
      Self::Sql => "sql",
      Self::Html => "html",
      Self::Css => "css",
      Self::Json => "json",
      Self::Yaml => "yaml",
      Self::Toml => "toml",
      Self::Markdown => "markdown",
      Self::Diff => "diff",
      Self::Text => "text",
    }
  }

  /// Language for a file extension (without the dot), case-insensitive.
  pub fn from_extension(ext: &str) -> Option<Self> {
    let lang = match ext.to_ascii_lowercase().as_str() {
      "rs" => Self::Rust,
      "ts" | "tsx" | "mts" | "cts" => Self::TypeScript,
      "js" | "jsx" | "mjs" | "cjs" => Self::JavaScript,
      "py" | "pyi" | "pyw" => Self::Python,
      "go" => Self::Go,
      "java" => Self::Java,
      "c" | "h" => Self::C,
      "cc" | "cpp" | "cxx" | "hpp" | "hh" | "hxx" => Self::Cpp,
      "rb" => Self::Ruby,
      "sh" | "bash" | "zsh" => Self::Shell,
      "sql" => Self::Sql,
      "html" | "htm" => Self::Html,
      "css" | "scss" => Self::Css,
      "json" => Self::Json,
      "yml" | "yaml" => Self::Yaml,
      "toml" => Self::Toml,
      "md" | "markdown" => Self::Markdown,
      "diff" | "patch" => Self::Diff,
      "txt" => Self::Text,
      _ => return None,
    };
    Some(lang)
  }

  /// Language for an interpreter name as found in a shebang line.
  pub fn from_interpreter(program: &str) -> Option<Self> {
    let lang = match program {
      p if p.starts_with("python") => Self::Python,
      "bash" | "sh" | "zsh" | "dash" | "ksh" => Self::Shell,
      "node" | "nodejs" | "deno" | "bun" => Self::JavaScript,
      "ruby" => Self::Ruby,
      _ => return None,
    };
    Some(lang)
  }

  /// Infer the language of a file.
  ///
  /// The extension takes priority. Only extensionless paths look at the
  /// shebang in `first_line`. Anything unresolved is [`Lang::Text`].
  pub fn infer(path: &str, first_line: Option<&str>) -> Self {
    let path = Path::new(path);
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
      return Self::from_extension(ext).unwrap_or(Self::Text);
    }
    first_line
      .and_then(shebang_program)
      .and_then(|program| Self::from_interpreter(&program))
      .unwrap_or(Self::Text)
  }
}

/// Interpreter named by a shebang line.
///
/// `#!/usr/bin/env python3` yields `python3`, `#!/bin/bash -e` yields
/// `bash`. Returns `None` for lines that are not shebangs or name no
/// program.
pub fn shebang_program(line: &str) -> Option<String> {
  let rest = line.strip_prefix("#!")?;
  let mut words = rest.split_whitespace();
  let first = words.next()?;
  let mut program = first.rsplit('/').next().unwrap_or(first);
  if program == "env" {
    // `env -S prog args` and plain `env prog`
    program = words.find(|w| !w.starts_with('-'))?;
  }
  if program.is_empty() {
    return None;
  }
  Some(program.to_string())
}
