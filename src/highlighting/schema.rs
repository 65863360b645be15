//! Syntax files
//!
//!     A syntax file is the serialized form of a definition: the settings, then a list of
//!     statements applied in order, the way a Vim syntax script issues `:syntax` commands.
//!     JSON and YAML are both accepted.
//!
//!         id: demo
//!         ignore_case: false
//!         iskeyword: "@,48-57,_"
//!         contexts: [doc]
//!         syntax:
//!           - kind: keyword
//!             group: Statement
//!             words: [if, else, "fu[nction]"]
//!           - kind: match
//!             group: Number
//!             pattern: '\d+'
//!           - kind: region
//!             group: String
//!             start: '"'
//!             skip: '\\"'
//!             end: { pattern: '"', offsets: "he=e-1" }
//!             oneline: true
//!           - kind: cluster
//!             name: "@Values"
//!             contains: "Number,String"
//!           - kind: link
//!             from: cTodo
//!             to: Todo
//!
//!     Statements take an optional `context`; without it they apply to the main context.

use super::definition::{SyntaxDefinition, SyntaxDefinitionBuilder};
use super::error::DefinitionError;
use super::item::ItemOptions;
use super::pattern::Pattern;
use super::region::Region;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error("invalid JSON syntax file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML syntax file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("cannot read syntax file {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyntaxFile {
    pub id: String,
    #[serde(default)]
    pub ignore_case: bool,
    /// `iskeyword` style list replacing the default keyword characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iskeyword: Option<String>,
    /// Extra keyword characters added on top of `iskeyword` or the default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iskeyword_add: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contexts: Vec<String>,
    #[serde(default)]
    pub syntax: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Statement {
    Keyword {
        group: String,
        words: Vec<String>,
        /// Overrides the file's `ignore_case` for these words.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ignore_case: Option<bool>,
        #[serde(flatten)]
        options: OptionsDecl,
    },
    Match {
        group: String,
        pattern: PatternDecl,
        #[serde(flatten)]
        options: OptionsDecl,
    },
    Region {
        group: String,
        start: OneOrMany<PatternDecl>,
        #[serde(default)]
        skip: OneOrMany<PatternDecl>,
        end: OneOrMany<PatternDecl>,
        #[serde(flatten)]
        options: OptionsDecl,
    },
    Cluster {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        contains: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        add: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        remove: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        context: Option<String>,
    },
    Link {
        from: String,
        to: String,
    },
}

/// Item arguments, spelled the way `:syntax` spells them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionsDecl {
    #[serde(default)]
    pub contained: bool,
    #[serde(default)]
    pub transparent: bool,
    #[serde(default)]
    pub skipwhite: bool,
    #[serde(default)]
    pub skipnl: bool,
    #[serde(default)]
    pub skipempty: bool,
    #[serde(default)]
    pub extend: bool,
    #[serde(default)]
    pub keepend: bool,
    #[serde(default)]
    pub oneline: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub containedin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nextgroup: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl OptionsDecl {
    fn to_item_options(&self) -> ItemOptions {
        ItemOptions {
            contained: self.contained,
            transparent: self.transparent,
            skip_white: self.skipwhite,
            skip_nl: self.skipnl,
            skip_empty: self.skipempty,
            extend: self.extend,
            keep_end: self.keepend,
            one_line: self.oneline,
            contains: self.contains.clone(),
            contained_in: self.containedin.clone(),
            next_group: self.nextgroup.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatternDecl {
    Source(String),
    Full {
        pattern: String,
        /// Vim offsets, e.g. `ms=s+1,he=e-1,lc=2`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        offsets: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        matchgroup: Option<String>,
        #[serde(default)]
        excludenl: bool,
    },
}

impl PatternDecl {
    fn build(&self) -> Result<Pattern, DefinitionError> {
        match self {
            PatternDecl::Source(source) => Pattern::new(source.as_str()),
            PatternDecl::Full {
                pattern,
                offsets,
                matchgroup,
                excludenl,
            } => {
                let mut built = Pattern::new(pattern.as_str())?;
                if let Some(offsets) = offsets {
                    built = built.with_offsets(offsets)?;
                }
                if let Some(group) = matchgroup {
                    built = built.with_matchgroup(group.as_str());
                }
                if *excludenl {
                    built = built.exclude_newline();
                }
                Ok(built)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    pub fn as_slice(&self) -> &[T] {
        match self {
            OneOrMany::One(item) => std::slice::from_ref(item),
            OneOrMany::Many(items) => items,
        }
    }
}

impl SyntaxFile {
    pub fn from_json(text: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_yaml(text: &str) -> Result<Self, SchemaError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Loads a `.json` file as JSON and anything else as YAML.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(&text)
        } else {
            Self::from_yaml(&text)
        }
    }

    /// Replays the statements against a builder and freezes the result.
    pub fn build(&self) -> Result<SyntaxDefinition, SchemaError> {
        let mut builder = SyntaxDefinitionBuilder::new(self.id.as_str());
        builder.set_ignore_case(self.ignore_case);
        if let Some(list) = &self.iskeyword {
            builder.set_keyword_chars(list)?;
        }
        if let Some(list) = &self.iskeyword_add {
            builder.add_keyword_chars(list)?;
        }
        for context in &self.contexts {
            builder.create_context(context)?;
        }

        for statement in &self.syntax {
            apply(&mut builder, statement, self.ignore_case)?;
        }

        debug!(id = %self.id, statements = self.syntax.len(), "syntax file applied");
        Ok(builder.finish()?)
    }
}

fn select_context(
    builder: &mut SyntaxDefinitionBuilder,
    context: Option<&str>,
) -> Result<(), DefinitionError> {
    match context {
        Some(name) => builder.use_context(name),
        None => {
            builder.use_main_context();
            Ok(())
        }
    }
}

fn apply(
    builder: &mut SyntaxDefinitionBuilder,
    statement: &Statement,
    ignore_case: bool,
) -> Result<(), DefinitionError> {
    match statement {
        Statement::Keyword {
            group,
            words,
            ignore_case: case_override,
            options,
        } => {
            select_context(builder, options.context.as_deref())?;
            builder.set_ignore_case(case_override.unwrap_or(ignore_case));
            builder.add_keywords(group, words, options.to_item_options());
            builder.set_ignore_case(ignore_case);
        }
        Statement::Match {
            group,
            pattern,
            options,
        } => {
            select_context(builder, options.context.as_deref())?;
            builder.add_match(group, pattern.build()?, options.to_item_options());
        }
        Statement::Region {
            group,
            start,
            skip,
            end,
            options,
        } => {
            select_context(builder, options.context.as_deref())?;
            let mut region = Region::new();
            for pattern in start.as_slice() {
                region = region.start(pattern.build()?);
            }
            for pattern in skip.as_slice() {
                region = region.skip(pattern.build()?);
            }
            for pattern in end.as_slice() {
                region = region.end(pattern.build()?);
            }
            builder.add_region(group, region, options.to_item_options());
        }
        Statement::Cluster {
            name,
            contains,
            add,
            remove,
            context,
        } => {
            select_context(builder, context.as_deref())?;
            if let Some(expr) = contains {
                builder.define_cluster(name, expr)?;
            }
            if let Some(expr) = add {
                builder.add_to_cluster(name, expr)?;
            }
            if let Some(expr) = remove {
                builder.remove_from_cluster(name, expr)?;
            }
            if contains.is_none() && add.is_none() && remove.is_none() {
                builder.add_to_cluster(name, "")?;
            }
        }
        Statement::Link { from, to } => builder.add_highlight_link(from, to),
    }
    Ok(())
}
