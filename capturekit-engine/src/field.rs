//! Field definitions after variable resolution

use crate::{resolver::Resolver, CaptureError};
use capturekit_config::{Field, FormatOptions, FormatSpec};
use tracing::warn;

/// How a field is prompted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Text,
    WideText,
    YesNo,
    Suggester,
}

impl PromptKind {
    /// Parse the `prompt` discriminator of a field
    pub fn parse(prompt: &str) -> Option<Self> {
        match prompt.trim() {
            "inputPrompt" | "text" => Some(Self::Text),
            "wideInputPrompt" | "wideText" => Some(Self::WideText),
            "yesNoPrompt" | "yesNo" => Some(Self::YesNo),
            "suggester" | "list" => Some(Self::Suggester),
            _ => None,
        }
    }
}

/// A field with every attribute resolved
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Name with commas removed, used as the CSV column
    pub name: String,
    /// Raw discriminator, kept for diagnostics
    pub prompt: String,
    pub kind: Option<PromptKind>,
    pub required: bool,
    pub write: bool,
    pub has_icons: bool,
    pub format: Option<FormatOptions>,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub list_path: Option<String>,
}

impl FieldSpec {
    /// Resolve a declared field. `index` and `category` only feed errors and
    /// diagnostics.
    pub fn resolve(
        field: &Field,
        index: usize,
        category: &str,
        resolver: &Resolver,
    ) -> Result<Self, CaptureError> {
        let name = resolver.resolve_opt(field.name.as_deref())?.unwrap_or_default();
        if name.is_empty() {
            return Err(CaptureError::MissingFieldName {
                category: category.to_string(),
                index,
            });
        }
        let name = if name.contains(',') {
            warn!(field = %name, category, "Removing commas from field name");
            name.replace(',', "")
        } else {
            name
        };

        let prompt = resolver.resolve_opt(field.prompt.as_deref())?.unwrap_or_default();
        let format = match &field.format {
            None => None,
            Some(FormatSpec::Options(options)) => Some(*options),
            Some(FormatSpec::Name(name)) => Some(FormatSpec::Name(resolver.resolve(name)?).options()),
            Some(FormatSpec::Names(names)) => {
                let names = names
                    .iter()
                    .map(|n| resolver.resolve(n))
                    .collect::<Result<Vec<_>, _>>()?;
                Some(FormatSpec::Names(names).options())
            }
        };

        Ok(Self {
            name,
            kind: PromptKind::parse(&prompt),
            prompt,
            required: resolver.is_set(field.required.as_ref())?,
            write: resolver.is_set(field.write.as_ref())?,
            has_icons: resolver.is_set(field.has_icons.as_ref())?,
            format,
            prefix: resolver.resolve_opt(field.prefix.as_deref())?,
            suffix: resolver.resolve_opt(field.suffix.as_deref())?,
            list_path: resolver.resolve_opt(field.list_path.as_deref())?,
        })
    }

    /// Label shown when prompting for this field
    pub fn label(&self) -> String {
        if self.required {
            format!("{} (Required)", self.name)
        } else {
            self.name.clone()
        }
    }

    /// `prefix + value + suffix`
    pub fn wrap(&self, value: &str) -> String {
        format!(
            "{}{}{}",
            self.prefix.as_deref().unwrap_or_default(),
            value,
            self.suffix.as_deref().unwrap_or_default()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{context::VariableRegistry, expression::NoExpressions};
    use capturekit_config::Flag;
    use rstest::rstest;
    use std::sync::Arc;

    fn resolver() -> Resolver {
        let registry = VariableRegistry::new();
        registry.set("unit", "/10");
        registry.set("needed", "true");
        registry.set("style", "bold");
        Resolver::new(registry, Arc::new(NoExpressions))
    }

    #[rstest]
    #[case("inputPrompt", Some(PromptKind::Text))]
    #[case("wideInputPrompt", Some(PromptKind::WideText))]
    #[case("yesNoPrompt", Some(PromptKind::YesNo))]
    #[case("suggester", Some(PromptKind::Suggester))]
    #[case("dropdown", None)]
    #[case("", None)]
    fn test_prompt_kind(#[case] prompt: &str, #[case] expected: Option<PromptKind>) {
        assert_eq!(PromptKind::parse(prompt), expected);
    }

    #[test]
    fn test_resolve_field() {
        let field = Field {
            name: Some("Rating, 1-10".into()),
            prompt: Some("inputPrompt".into()),
            required: Some(Flag::Text("var(needed)".into())),
            write: Some(Flag::Bool(true)),
            format: Some(FormatSpec::Name("var(style)".into())),
            suffix: Some("var(unit)".into()),
            ..Default::default()
        };
        let spec = FieldSpec::resolve(&field, 0, "Exercise", &resolver()).unwrap();
        assert_eq!(spec.name, "Rating 1-10");
        assert_eq!(spec.kind, Some(PromptKind::Text));
        assert!(spec.required);
        assert!(spec.write);
        assert!(!spec.has_icons);
        assert!(spec.format.unwrap().bold);
        assert_eq!(spec.wrap("8"), "8/10");
        assert_eq!(spec.label(), "Rating 1-10 (Required)");
    }

    #[test]
    fn test_missing_name() {
        let field = Field {
            prompt: Some("inputPrompt".into()),
            ..Default::default()
        };
        let err = FieldSpec::resolve(&field, 3, "Mood", &resolver()).unwrap_err();
        assert!(matches!(
            err,
            CaptureError::MissingFieldName { index: 3, .. }
        ));
    }
}
