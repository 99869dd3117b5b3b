//! Typed filter graph.
//!
//! The compiler builds a small DAG of filter chains connected by labeled
//! pads. It is rendered to ffmpeg's `-filter_complex` syntax only when the
//! process arguments are assembled, so graph structure can be inspected
//! (and tested) without spawning anything.

use std::collections::HashSet;
use std::fmt;

use cutflow_project_model::{ClipId, EffectKind, TextId};

/// Elementary stream type of an input pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Video,
    Audio,
}

impl StreamKind {
    fn specifier(self) -> &'static str {
        match self {
            Self::Video => "v",
            Self::Audio => "a",
        }
    }
}

/// Name of an intermediate stream produced by one chain and consumed by
/// another (or by an output map).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Label(String);

impl Label {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0)
    }
}

/// An input pad of a chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PadRef {
    /// A stream of one of the process inputs, by input index.
    Input { index: usize, stream: StreamKind },
    /// The output of an earlier chain.
    Label(Label),
}

impl PadRef {
    pub fn video(index: usize) -> Self {
        Self::Input {
            index,
            stream: StreamKind::Video,
        }
    }

    pub fn audio(index: usize) -> Self {
        Self::Input {
            index,
            stream: StreamKind::Audio,
        }
    }
}

impl From<Label> for PadRef {
    fn from(label: Label) -> Self {
        Self::Label(label)
    }
}

impl fmt::Display for PadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input { index, stream } => write!(f, "[{index}:{}]", stream.specifier()),
            Self::Label(label) => label.fmt(f),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ArgValue {
    Plain(String),
    /// Expression containing commas, wrapped in single quotes.
    Expr(String),
}

/// One filter with its options.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    name: String,
    args: Vec<(Option<String>, ArgValue)>,
}

impl Filter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// `key=value` option. The value is escaped for the filter parser.
    pub fn arg(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.args
            .push((Some(key.into()), ArgValue::Plain(value.to_string())));
        self
    }

    /// Positional option.
    pub fn positional(mut self, value: impl ToString) -> Self {
        self.args.push((None, ArgValue::Plain(value.to_string())));
        self
    }

    /// `key='expr'` option for expressions that contain commas.
    pub fn expr(mut self, key: impl Into<String>, expr: impl Into<String>) -> Self {
        self.args.push((Some(key.into()), ArgValue::Expr(expr.into())));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw value of a named option.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.args.iter().find_map(|(k, v)| match (k, v) {
            (Some(k), ArgValue::Plain(v) | ArgValue::Expr(v)) if k == key => Some(v.as_str()),
            _ => None,
        })
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for (i, (key, value)) in self.args.iter().enumerate() {
            f.write_str(if i == 0 { "=" } else { ":" })?;
            if let Some(key) = key {
                write!(f, "{key}=")?;
            }
            match value {
                ArgValue::Plain(v) => f.write_str(&escape_value(v))?,
                ArgValue::Expr(v) => write!(f, "'{}'", v.replace('\'', "'\\''"))?,
            }
        }
        Ok(())
    }
}

/// What a chain is for. Used for structural queries and logging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChainRole {
    NormalizeVideo { clip: ClipId },
    NormalizeImage { clip: ClipId },
    Concat { inputs: usize },
    TextOverlay { text: TextId },
    Effect { kind: EffectKind },
    TrimAudio { clip: ClipId },
    Mix { inputs: usize },
}

/// A linear sequence of filters with labeled inputs and outputs.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterChain {
    pub role: ChainRole,
    pub inputs: Vec<PadRef>,
    pub filters: Vec<Filter>,
    pub outputs: Vec<Label>,
}

impl FilterChain {
    pub fn new(role: ChainRole) -> Self {
        Self {
            role,
            inputs: Vec::new(),
            filters: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn input(mut self, pad: impl Into<PadRef>) -> Self {
        self.inputs.push(pad.into());
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn output(mut self, label: Label) -> Self {
        self.outputs.push(label);
        self
    }

    /// Whether any filter in the chain has the given name.
    pub fn uses(&self, filter_name: &str) -> bool {
        self.filters.iter().any(|f| f.name == filter_name)
    }
}

impl fmt::Display for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for pad in &self.inputs {
            pad.fmt(f)?;
        }
        for (i, filter) in self.filters.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            filter.fmt(f)?;
        }
        for label in &self.outputs {
            label.fmt(f)?;
        }
        Ok(())
    }
}

/// Structural defect in a graph.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("chain {chain} has no filters")]
    EmptyChain { chain: usize },

    #[error("chain {chain} references input {index} but only {available} inputs exist")]
    InputOutOfRange {
        chain: usize,
        index: usize,
        available: usize,
    },

    #[error("label [{label}] is consumed by chain {chain} before it is produced")]
    UnproducedLabel { chain: usize, label: String },

    #[error("label [{label}] is consumed more than once")]
    LabelReused { label: String },

    #[error("label [{label}] is produced more than once")]
    DuplicateOutput { label: String },
}

/// Ordered set of chains. Chains appear in dependency order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterGraph {
    chains: Vec<FilterChain>,
}

impl FilterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chain: FilterChain) {
        self.chains.push(chain);
    }

    pub fn chains(&self) -> &[FilterChain] {
        &self.chains
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn count(&self, pred: impl Fn(&ChainRole) -> bool) -> usize {
        self.chains.iter().filter(|c| pred(&c.role)).count()
    }

    pub fn find(&self, pred: impl Fn(&ChainRole) -> bool) -> Option<&FilterChain> {
        self.chains.iter().find(|c| pred(&c.role))
    }

    /// Check that the graph is a well-formed DAG over `input_count`
    /// process inputs: every label is produced once, consumed at most once,
    /// and only after it was produced.
    pub fn validate(&self, input_count: usize) -> Result<(), GraphError> {
        let mut produced: HashSet<&str> = HashSet::new();
        let mut consumed: HashSet<&str> = HashSet::new();

        for (i, chain) in self.chains.iter().enumerate() {
            if chain.filters.is_empty() {
                return Err(GraphError::EmptyChain { chain: i });
            }
            for pad in &chain.inputs {
                match pad {
                    PadRef::Input { index, .. } if *index >= input_count => {
                        return Err(GraphError::InputOutOfRange {
                            chain: i,
                            index: *index,
                            available: input_count,
                        });
                    }
                    PadRef::Input { .. } => {}
                    PadRef::Label(label) => {
                        if !produced.contains(label.as_str()) {
                            return Err(GraphError::UnproducedLabel {
                                chain: i,
                                label: label.0.clone(),
                            });
                        }
                        if !consumed.insert(label.as_str()) {
                            return Err(GraphError::LabelReused {
                                label: label.0.clone(),
                            });
                        }
                    }
                }
            }
            for label in &chain.outputs {
                if !produced.insert(label.as_str()) {
                    return Err(GraphError::DuplicateOutput {
                        label: label.0.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Whether `label` is produced by some chain and not consumed by another.
    pub fn is_terminal(&self, label: &Label) -> bool {
        let produced = self.chains.iter().any(|c| c.outputs.contains(label));
        let consumed = self
            .chains
            .iter()
            .any(|c| c.inputs.iter().any(|p| p == &PadRef::Label(label.clone())));
        produced && !consumed
    }

    /// Render as a `-filter_complex` argument.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FilterGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, chain) in self.chains.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            chain.fmt(f)?;
        }
        Ok(())
    }
}

/// Escape a plain option value for the filtergraph parser.
pub fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | ':' | '\'' | ',' | ';' | '[' | ']') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Format seconds or factors without float noise: at most three decimals,
/// no trailing zeros.
pub fn num(value: f64) -> String {
    let rounded = (value * 1000.0).round() / 1000.0;
    if rounded == 0.0 {
        return "0".to_string();
    }
    format!("{rounded}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scale_chain(index: usize, out: &str) -> FilterChain {
        FilterChain::new(ChainRole::NormalizeVideo { clip: ClipId(1) })
            .input(PadRef::video(index))
            .filter(Filter::new("scale").positional(1920).positional(1080))
            .output(Label::new(out))
    }

    #[test]
    fn test_render_chain_syntax() {
        let mut graph = FilterGraph::new();
        graph.push(scale_chain(0, "v0"));
        graph.push(scale_chain(1, "v1"));
        graph.push(
            FilterChain::new(ChainRole::Concat { inputs: 2 })
                .input(Label::new("v0"))
                .input(Label::new("v1"))
                .filter(
                    Filter::new("concat")
                        .arg("n", 2)
                        .arg("v", 1)
                        .arg("a", 0),
                )
                .output(Label::new("vcat")),
        );

        assert_eq!(
            graph.render(),
            "[0:v]scale=1920:1080[v0];[1:v]scale=1920:1080[v1];[v0][v1]concat=n=2:v=1:a=0[vcat]"
        );
        assert!(graph.validate(2).is_ok());
        assert!(graph.is_terminal(&Label::new("vcat")));
        assert!(!graph.is_terminal(&Label::new("v0")));
    }

    #[test]
    fn test_expr_args_are_quoted() {
        let filter = Filter::new("drawtext")
            .arg("fontsize", 48)
            .expr("enable", "between(t,1,2.5)");
        assert_eq!(
            filter.to_string(),
            "drawtext=fontsize=48:enable='between(t,1,2.5)'"
        );
        assert_eq!(filter.get("enable"), Some("between(t,1,2.5)"));
    }

    #[test]
    fn test_plain_values_are_escaped() {
        assert_eq!(escape_value("C:\\tmp\\a b.txt"), "C\\:\\\\tmp\\\\a b.txt");
        assert_eq!(escape_value("it's"), "it\\'s");
    }

    #[test]
    fn test_validate_rejects_unproduced_label() {
        let mut graph = FilterGraph::new();
        graph.push(
            FilterChain::new(ChainRole::Mix { inputs: 1 })
                .input(Label::new("a9"))
                .filter(Filter::new("anull"))
                .output(Label::new("aout")),
        );
        assert!(matches!(
            graph.validate(1),
            Err(GraphError::UnproducedLabel { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_out_of_range_input_and_duplicates() {
        let mut graph = FilterGraph::new();
        graph.push(scale_chain(3, "v0"));
        assert!(matches!(
            graph.validate(1),
            Err(GraphError::InputOutOfRange { index: 3, .. })
        ));

        let mut graph = FilterGraph::new();
        graph.push(scale_chain(0, "v0"));
        graph.push(scale_chain(0, "v0"));
        assert_eq!(
            graph.validate(1),
            Err(GraphError::DuplicateOutput {
                label: "v0".to_string()
            })
        );
    }

    #[test]
    fn test_num_formatting() {
        assert_eq!(num(12.0), "12");
        assert_eq!(num(0.1 + 0.2), "0.3");
        assert_eq!(num(1.25), "1.25");
        assert_eq!(num(-0.0), "0");
    }
}
