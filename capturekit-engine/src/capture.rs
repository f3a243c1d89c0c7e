//! Field capture state machine
//!
//! One session walks `SelectCategory -> fields in declared order -> comment`.
//! Any step may abort the session with a [`CaptureError`]; an optional field
//! that gets no answer degrades to an empty value instead.
//!
//! Two outputs accumulate along the way:
//! - field pairs: raw values keyed by field name, for the CSV sink
//! - writeable fields: formatted values of `write` fields, for the notes sink
//!
//! Both are mirrored into the variable registry after every field so the host
//! sees partial progress even when the session aborts.

use crate::{
    context::{keys, VariableRegistry},
    field::{FieldSpec, PromptKind},
    format::format_value,
    paths::{ensure_folder, normalize, PathMode},
    prompt::PromptProvider,
    resolver::Resolver,
    storage::{FileHandle, Storage},
    CaptureError,
};
use capturekit_common::Pretty;
use capturekit_config::{CaptureConfig, Category, ConfigError};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, error, info, warn};

/// Label of the list entry that adds a new item
pub const ADD_ITEM_LABEL: &str = "✨ Add";
/// Value returned when [`ADD_ITEM_LABEL`] is chosen
pub const ADD_ITEM_VALUE: &str = "!add";
/// Field pairs key of the comment field
pub const COMMENT_KEY: &str = "Comment";

static ICON_SPLIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\S+)\s+(.+)").expect("icon split pattern is valid"));

/// The category chosen for this session
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedCategory {
    /// Resolved category key
    pub key: String,
    /// `category.name`, or the key when no name is set
    pub name: String,
    /// Category icon, empty when none is set
    pub icon: String,
    pub category: Category,
}

/// Outputs accumulated while capturing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureState {
    pub field_pairs: IndexMap<String, Value>,
    pub writeable_fields: Vec<String>,
}

impl CaptureState {
    /// Continue from whatever the host registry already holds
    pub fn from_registry(registry: &VariableRegistry) -> Self {
        let field_pairs = match registry.get(keys::FIELD_PAIRS) {
            Some(Value::Object(map)) => map.into_iter().collect(),
            _ => IndexMap::new(),
        };
        let writeable_fields = match registry.get(keys::WRITEABLE_FIELDS) {
            Some(Value::Array(items)) => items
                .iter()
                .map(crate::context::value_to_text)
                .collect(),
            _ => Vec::new(),
        };
        Self {
            field_pairs,
            writeable_fields,
        }
    }

    /// Mirror both outputs into the registry
    pub fn sync(&self, registry: &VariableRegistry) {
        let pairs: serde_json::Map<String, Value> = self
            .field_pairs
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        registry.set(keys::FIELD_PAIRS, Value::Object(pairs));
        registry.set(
            keys::WRITEABLE_FIELDS,
            Value::Array(
                self.writeable_fields
                    .iter()
                    .cloned()
                    .map(Value::String)
                    .collect(),
            ),
        );
    }
}

/// Drives the prompts for one category
pub struct FieldCapture<'a> {
    prompts: &'a dyn PromptProvider,
    storage: &'a dyn Storage,
    resolver: &'a Resolver,
    strict_yes_no: bool,
}

impl<'a> FieldCapture<'a> {
    pub fn new(
        prompts: &'a dyn PromptProvider,
        storage: &'a dyn Storage,
        resolver: &'a Resolver,
    ) -> Self {
        Self {
            prompts,
            storage,
            resolver,
            strict_yes_no: false,
        }
    }

    /// Abort on a required yes/no field that gets no boolean answer. Off by
    /// default: the miss is only logged.
    pub fn strict_yes_no(mut self, strict: bool) -> Self {
        self.strict_yes_no = strict;
        self
    }

    fn registry(&self) -> &VariableRegistry {
        self.resolver.registry()
    }

    /// Select a category, then capture its fields and comment
    pub async fn run(
        &self,
        config: &mut CaptureConfig,
        state: &mut CaptureState,
    ) -> Result<SelectedCategory, CaptureError> {
        let mut selected = self.select_category(config).await?;
        self.capture_fields(&mut selected, state).await?;
        self.capture_comment(&selected, state).await?;
        info!(
            category = %selected.key,
            "Capture successful{}",
            Pretty(&state.field_pairs)
        );
        Ok(selected)
    }

    /// Resolve the category keys in place and ask the user to pick one
    pub async fn select_category(
        &self,
        config: &mut CaptureConfig,
    ) -> Result<SelectedCategory, CaptureError> {
        let Some(categories) = config.categories.take() else {
            error!("Missing category section in config");
            self.prompts
                .info(
                    "Missing category section in config",
                    "Run `capturekit init` for an example configuration",
                )
                .await;
            return Err(ConfigError::MissingCategories.into());
        };

        let mut resolved = IndexMap::with_capacity(categories.len());
        for (key, category) in categories {
            resolved.insert(self.resolver.resolve(&key)?, category);
        }
        let categories = config.categories.insert(resolved);

        if categories.is_empty() {
            error!("Category list is empty in config");
            self.prompts
                .info(
                    "Empty category list",
                    "Run `capturekit init` for an example configuration",
                )
                .await;
            return Err(ConfigError::EmptyCategories.into());
        }

        let actual: Vec<String> = categories.keys().cloned().collect();
        let display_labels: Vec<String> = categories
            .iter()
            .map(|(key, category)| match category.icon.as_deref() {
                Some(icon) if !icon.is_empty() => format!("{icon} {key}"),
                _ => key.clone(),
            })
            .collect();
        debug!(display = ?display_labels, "Prompting for category");

        let key = self
            .prompts
            .select(&display_labels, &actual)
            .await
            .filter(|key| categories.contains_key(key))
            .ok_or_else(|| {
                error!("No category selected");
                CaptureError::NoCategorySelected
            })?;

        let Some(category) = categories.get_mut(&key) else {
            return Err(CaptureError::NoCategorySelected);
        };
        category.fields_mut();
        let category = category.clone();

        let name = match category.name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => key.clone(),
        };
        let icon = category.icon.clone().unwrap_or_default();

        let registry = self.registry();
        registry.set(
            keys::CATEGORY,
            serde_json::to_value(&category).map_err(ConfigError::from)?,
        );
        registry.set(keys::NAME, name.clone());
        registry.set(keys::ICON, icon.clone());
        debug!(category = %key, "Category selected");

        Ok(SelectedCategory {
            key,
            name,
            icon,
            category,
        })
    }

    /// Prompt for every field of the category, in declared order
    pub async fn capture_fields(
        &self,
        selected: &mut SelectedCategory,
        state: &mut CaptureState,
    ) -> Result<(), CaptureError> {
        let fields = selected.category.fields_mut().clone();
        debug!(category = %selected.name, count = fields.len(), "Prompting for fields");

        for (index, field) in fields.iter().enumerate() {
            let spec = FieldSpec::resolve(field, index, &selected.name, self.resolver)?;
            debug!(field = %spec.name, category = %selected.name, "Prompting for input");

            let value = match spec.kind {
                Some(PromptKind::Text) | Some(PromptKind::WideText) => {
                    self.capture_text(&spec, state).await?
                }
                Some(PromptKind::YesNo) => self.capture_yes_no(&spec, state).await?,
                Some(PromptKind::Suggester) => {
                    self.capture_from_list(&spec, &selected.name, state).await?
                }
                None => {
                    error!(prompt = %spec.prompt, field = %spec.name, "Missing, incorrect, or unsupported prompt type");
                    return Err(CaptureError::UnsupportedPrompt {
                        field: spec.name,
                        prompt: spec.prompt,
                    });
                }
            };

            state.field_pairs.insert(spec.name.clone(), value);
            state.sync(self.registry());
            debug!(field = %spec.name, "Added capture for field");
        }
        Ok(())
    }

    async fn capture_text(
        &self,
        spec: &FieldSpec,
        state: &mut CaptureState,
    ) -> Result<Value, CaptureError> {
        let label = spec.label();
        let answer = match spec.kind {
            Some(PromptKind::WideText) => self.prompts.wide_text(&label).await,
            _ => self.prompts.text(&label).await,
        };
        let input = self.resolver.resolve(&answer.unwrap_or_default())?;

        if input.is_empty() {
            return self.blank(spec);
        }
        if spec.write {
            let writeable = self.resolver.resolve(&spec.wrap(&input))?;
            state
                .writeable_fields
                .push(format_value(&writeable, spec.format.as_ref()));
        }
        Ok(Value::String(input))
    }

    async fn capture_yes_no(
        &self,
        spec: &FieldSpec,
        state: &mut CaptureState,
    ) -> Result<Value, CaptureError> {
        match self.prompts.yes_no(&spec.name, "").await {
            Some(answer) => {
                if spec.write {
                    let writeable = self.resolver.resolve(&spec.wrap(&answer.to_string()))?;
                    state
                        .writeable_fields
                        .push(format_value(&writeable, spec.format.as_ref()));
                }
                Ok(Value::Bool(answer))
            }
            None if self.strict_yes_no && spec.required => {
                error!(field = %spec.name, "No answer received for required yes/no field");
                Err(CaptureError::RequiredFieldBlank {
                    field: spec.name.clone(),
                })
            }
            None => {
                error!(field = %spec.name, required = spec.required, "No input received");
                Ok(Value::Null)
            }
        }
    }

    async fn capture_from_list(
        &self,
        spec: &FieldSpec,
        category: &str,
        state: &mut CaptureState,
    ) -> Result<Value, CaptureError> {
        let Some(file) = self.open_list(spec).await? else {
            return self.blank(spec);
        };

        let selected = loop {
            let lines = self.list_items(&file).await?;
            let mut display = lines.clone();
            display.push(ADD_ITEM_LABEL.to_string());
            let mut actual = lines;
            actual.push(ADD_ITEM_VALUE.to_string());

            match self.prompts.select(&display, &actual).await {
                Some(choice) if choice == ADD_ITEM_VALUE => {
                    self.add_list_item(spec, category, &file).await?;
                }
                Some(choice) if !choice.is_empty() => break choice,
                _ => {
                    error!(field = %spec.name, "Nothing selected from the list");
                    return self.blank(spec);
                }
            }
        };

        let format = spec.format.as_ref();
        let decorated = match ICON_SPLIT.captures(&selected).filter(|_| spec.has_icons) {
            Some(parts) => format!("{} {}", &parts[1], format_value(&parts[2], format)),
            None => format_value(&selected, format),
        };
        let writeable = self.resolver.resolve(&spec.wrap(&decorated))?;
        let mut input = self.resolver.resolve(&selected)?;
        if spec.has_icons {
            if let Some(parts) = ICON_SPLIT.captures(&input) {
                input = parts[2].to_string();
            }
        }

        if spec.write {
            state.writeable_fields.push(writeable);
        }
        Ok(Value::String(input))
    }

    /// The list file, created empty when missing. `Ok(None)` when the list
    /// cannot be used and the field is optional.
    async fn open_list(&self, spec: &FieldSpec) -> Result<Option<FileHandle>, CaptureError> {
        let raw_path = spec.list_path.clone().unwrap_or_default();
        let unavailable = || {
            if spec.required {
                Err(CaptureError::ListUnavailable {
                    field: spec.name.clone(),
                    path: raw_path.clone(),
                })
            } else {
                Ok(None)
            }
        };

        let Some(path) = normalize(&raw_path, PathMode::File) else {
            error!(path = %raw_path, field = %spec.name, "Missing or invalid path for list");
            return unavailable();
        };

        match self.storage.exists(&path).await {
            Ok(Some(file)) => return Ok(Some(file)),
            Ok(None) => {}
            Err(e) => {
                error!(path = %path, field = %spec.name, error = %e, "Cannot open file for list");
                return unavailable();
            }
        }

        info!(path = %path, field = %spec.name, "File for list not found; trying to create");
        let created = match ensure_folder(self.storage, &path).await {
            Ok(()) => self.storage.create(&path, "").await,
            Err(e) => Err(e),
        };
        match created {
            Ok(file) => {
                debug!(path = %path, "File for list created");
                Ok(Some(file))
            }
            Err(e) => {
                error!(path = %path, field = %spec.name, error = %e, "Failed to create file for list");
                unavailable()
            }
        }
    }

    /// Non-blank lines of the list, each resolved
    async fn list_items(&self, file: &FileHandle) -> Result<Vec<String>, CaptureError> {
        let content = self.storage.read(file).await?;
        let mut items = Vec::new();
        for line in content.trim().lines().filter(|l| !l.trim().is_empty()) {
            items.push(self.resolver.resolve(line)?);
        }
        Ok(items)
    }

    async fn add_list_item(
        &self,
        spec: &FieldSpec,
        category: &str,
        file: &FileHandle,
    ) -> Result<(), CaptureError> {
        debug!(field = %spec.name, "Prompting for new item in list");

        let icon = if spec.has_icons {
            let label = format!("Icon for new \"{}\" in \"{}\"", spec.name, category);
            let icon: String = self
                .prompts
                .text(&label)
                .await
                .unwrap_or_default()
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect();
            if icon.is_empty() {
                warn!(field = %spec.name, "Invalid icon entered");
                return Ok(());
            }
            Some(icon)
        } else {
            None
        };

        let label = format!("Name for new \"{}\" in \"{}\"", spec.name, category);
        let name = self.prompts.text(&label).await.unwrap_or_default();
        let name = name.trim();
        if name.is_empty() {
            warn!(field = %spec.name, "Invalid name entered");
            return Ok(());
        }

        let line = match &icon {
            Some(icon) => format!("{icon} {name}"),
            None => name.to_string(),
        };
        let content = self.storage.read(file).await?;
        let updated = format!("{}\n{}", content.trim(), line);
        self.storage.write(file, updated.trim()).await?;
        info!(item = %line, field = %spec.name, "Added new option");
        Ok(())
    }

    /// Comment prompt, unless the category disables it
    pub async fn capture_comment(
        &self,
        selected: &SelectedCategory,
        state: &mut CaptureState,
    ) -> Result<(), CaptureError> {
        let category = &selected.category;
        if self
            .resolver
            .is_set(category.disable_comment_field.as_ref())?
        {
            debug!(category = %selected.name, "Comment field disabled");
            return Ok(());
        }

        debug!(category = %selected.name, "Prompting for comment");
        let label = format!("Comment for {}", selected.name);
        let mut input = self.prompts.text(&label).await.unwrap_or_default();
        if let Some(prefix) = comment_affix(category.comment_field_prefix.as_ref(), "prefix") {
            input = format!("{prefix}{input}");
        }
        if let Some(suffix) = comment_affix(category.comment_field_suffix.as_ref(), "suffix") {
            input = format!("{input}{suffix}");
        }
        let input = self.resolver.resolve(&input)?;

        if !input.is_empty() {
            let format = category.comment_field_format.as_ref().map(|f| f.options());
            state
                .writeable_fields
                .push(format_value(&input, format.as_ref()));
        }
        state
            .field_pairs
            .insert(COMMENT_KEY.to_string(), Value::String(input));
        state.sync(self.registry());
        Ok(())
    }

    fn blank(&self, spec: &FieldSpec) -> Result<Value, CaptureError> {
        if spec.required {
            error!(field = %spec.name, "No input received for required field");
            return Err(CaptureError::RequiredFieldBlank {
                field: spec.name.clone(),
            });
        }
        Ok(Value::String(String::new()))
    }
}

/// Comment affixes only apply when configured as the boolean `true`, which
/// contributes the text `true`
fn comment_affix(value: Option<&Value>, which: &str) -> Option<&'static str> {
    match value? {
        Value::Bool(true) => Some("true"),
        other => {
            debug!(?other, which, "Ignoring comment affix that is not `true`");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        expression::NoExpressions,
        prompt::{AskedPrompt, ScriptedPrompts},
        storage::{FsStorage, MemoryStorage},
    };
    use serde_json::json;
    use std::sync::Arc;

    fn resolver() -> Resolver {
        Resolver::new(VariableRegistry::new(), Arc::new(NoExpressions))
    }

    fn config(value: Value) -> CaptureConfig {
        serde_json::from_value(value).unwrap()
    }

    fn single_field(field: Value) -> CaptureConfig {
        config(json!({
            "categories": {
                "Log": { "fields": [field], "disableCommentField": true }
            }
        }))
    }

    async fn run(
        config: &mut CaptureConfig,
        prompts: &ScriptedPrompts,
        storage: &MemoryStorage,
        resolver: &Resolver,
    ) -> Result<(SelectedCategory, CaptureState), CaptureError> {
        let mut state = CaptureState::default();
        let selected = FieldCapture::new(prompts, storage, resolver)
            .run(config, &mut state)
            .await?;
        Ok((selected, state))
    }

    #[tokio::test]
    async fn test_category_keys_resolved_and_icons_displayed() {
        let resolver = resolver();
        resolver.registry().set("who", "Mood");
        let mut cfg = config(json!({
            "categories": {
                "var(who)": { "icon": "🙂", "disableCommentField": true },
                "Sleep": { "disableCommentField": true }
            }
        }));
        let prompts = ScriptedPrompts::new(vec![json!("Mood")]);
        let storage = MemoryStorage::new();

        let (selected, _) = run(&mut cfg, &prompts, &storage, &resolver).await.unwrap();
        assert_eq!(selected.key, "Mood");
        assert_eq!(selected.icon, "🙂");
        assert_eq!(
            prompts.asked()[0],
            AskedPrompt::Select(vec!["🙂 Mood".into(), "Sleep".into()])
        );
        assert_eq!(resolver.registry().get_text("name").as_deref(), Some("Mood"));
        assert!(cfg.categories.unwrap().contains_key("Mood"));
        assert_eq!(
            selected.category.fields,
            Some(Vec::new()),
            "missing fields are populated"
        );
    }

    #[tokio::test]
    async fn test_missing_and_empty_categories() {
        let prompts = ScriptedPrompts::new(Vec::<Value>::new());
        let storage = MemoryStorage::new();

        let mut missing = CaptureConfig::default();
        let err = run(&mut missing, &prompts, &storage, &resolver()).await.unwrap_err();
        assert!(matches!(err, CaptureError::Config(ConfigError::MissingCategories)));

        let mut empty = config(json!({"categories": {}}));
        let err = run(&mut empty, &prompts, &storage, &resolver()).await.unwrap_err();
        assert!(matches!(err, CaptureError::Config(ConfigError::EmptyCategories)));
        assert_eq!(prompts.asked().len(), 2);
    }

    #[tokio::test]
    async fn test_no_category_selected() {
        let mut cfg = single_field(json!({"name": "A", "prompt": "inputPrompt"}));
        let prompts = ScriptedPrompts::new(vec![Value::Null]);
        let err = run(&mut cfg, &prompts, &MemoryStorage::new(), &resolver())
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::NoCategorySelected));
    }

    #[tokio::test]
    async fn test_text_field_written_and_formatted() {
        let mut cfg = single_field(json!({
            "name": "Distance", "prompt": "inputPrompt", "write": true,
            "format": {"bold": true}, "prefix": "ran ", "suffix": "k"
        }));
        let prompts = ScriptedPrompts::new(vec![json!("Log"), json!("5")]);
        let (_, state) = run(&mut cfg, &prompts, &MemoryStorage::new(), &resolver())
            .await
            .unwrap();
        assert_eq!(state.field_pairs["Distance"], json!("5"));
        assert_eq!(state.writeable_fields, vec!["**ran 5k**"]);
    }

    #[tokio::test]
    async fn test_required_text_blank_aborts() {
        let mut cfg = single_field(json!({"name": "Note", "prompt": "wideInputPrompt", "required": "true"}));
        let prompts = ScriptedPrompts::new(vec![json!("Log"), json!("")]);
        let resolver = resolver();
        let err = run(&mut cfg, &prompts, &MemoryStorage::new(), &resolver)
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::RequiredFieldBlank { .. }));
        assert_eq!(prompts.asked()[1], AskedPrompt::WideText("Note (Required)".into()));
    }

    #[tokio::test]
    async fn test_optional_text_blank_is_empty() {
        let mut cfg = single_field(json!({"name": "Note", "prompt": "inputPrompt", "write": true}));
        let prompts = ScriptedPrompts::new(vec![json!("Log"), Value::Null]);
        let (_, state) = run(&mut cfg, &prompts, &MemoryStorage::new(), &resolver())
            .await
            .unwrap();
        assert_eq!(state.field_pairs["Note"], json!(""));
        assert!(state.writeable_fields.is_empty());
    }

    #[tokio::test]
    async fn test_yes_no_policy() {
        let field = json!({"name": "Stretched", "prompt": "yesNoPrompt", "required": true, "write": true, "suffix": "!"});

        let mut cfg = single_field(field.clone());
        let prompts = ScriptedPrompts::new(vec![json!("Log"), json!(true)]);
        let (_, state) = run(&mut cfg, &prompts, &MemoryStorage::new(), &resolver())
            .await
            .unwrap();
        assert_eq!(state.field_pairs["Stretched"], json!(true));
        assert_eq!(state.writeable_fields, vec!["true!"]);

        let mut cfg = single_field(field.clone());
        let prompts = ScriptedPrompts::new(vec![json!("Log"), Value::Null]);
        let (_, state) = run(&mut cfg, &prompts, &MemoryStorage::new(), &resolver())
            .await
            .unwrap();
        assert_eq!(state.field_pairs["Stretched"], Value::Null);
        assert!(state.writeable_fields.is_empty());

        let mut cfg = single_field(field);
        let prompts = ScriptedPrompts::new(vec![json!("Log"), Value::Null]);
        let storage = MemoryStorage::new();
        let resolver = resolver();
        let mut state = CaptureState::default();
        let err = FieldCapture::new(&prompts, &storage, &resolver)
            .strict_yes_no(true)
            .run(&mut cfg, &mut state)
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::RequiredFieldBlank { .. }));
    }

    #[tokio::test]
    async fn test_list_selection_with_icons() {
        let mut cfg = single_field(json!({
            "name": "Activity", "prompt": "suggester", "listPath": "Lists/Activities.md",
            "hasIcons": true, "format": "italics", "write": true, "suffix": "!"
        }));
        let storage = MemoryStorage::new().with_file("Lists/Activities.md", "🏊 Swim\n\n🏃 Run\n");
        let prompts = ScriptedPrompts::new(vec![json!("Log"), json!("🏃 Run")]);
        let (_, state) = run(&mut cfg, &prompts, &storage, &resolver()).await.unwrap();

        assert_eq!(state.field_pairs["Activity"], json!("Run"));
        assert_eq!(state.writeable_fields, vec!["🏃 _Run_!"]);
        assert_eq!(
            prompts.asked()[1],
            AskedPrompt::Select(vec!["🏊 Swim".into(), "🏃 Run".into(), ADD_ITEM_LABEL.into()])
        );
    }

    #[tokio::test]
    async fn test_list_add_item_then_select() {
        let mut cfg = single_field(json!({
            "name": "Activity", "prompt": "suggester", "listPath": "//Lists//Activities.md",
            "hasIcons": true, "write": true
        }));
        let storage = MemoryStorage::new();
        let prompts = ScriptedPrompts::new(vec![
            json!("Log"),
            json!(ADD_ITEM_VALUE),
            json!(" 🚴 "),
            json!(" Bike "),
            json!("🚴 Bike"),
        ]);
        let (selected, state) = run(&mut cfg, &prompts, &storage, &resolver()).await.unwrap();

        assert_eq!(storage.file("Lists/Activities.md").as_deref(), Some("🚴 Bike"));
        assert!(storage.has_folder("Lists"));
        assert_eq!(state.field_pairs["Activity"], json!("Bike"));
        assert_eq!(state.writeable_fields, vec!["🚴 Bike"]);
        assert_eq!(
            prompts.asked()[2],
            AskedPrompt::Text(format!("Icon for new \"Activity\" in \"{}\"", selected.name))
        );
    }

    #[tokio::test]
    async fn test_list_add_item_blank_icon_returns_to_list() {
        let mut cfg = single_field(json!({
            "name": "Activity", "prompt": "suggester", "listPath": "a.md", "hasIcons": true
        }));
        let storage = MemoryStorage::new().with_file("a.md", "🏊 Swim");
        let prompts = ScriptedPrompts::new(vec![
            json!("Log"),
            json!(ADD_ITEM_VALUE),
            json!("   "),
            json!("🏊 Swim"),
        ]);
        let (_, state) = run(&mut cfg, &prompts, &storage, &resolver()).await.unwrap();
        assert_eq!(storage.file("a.md").as_deref(), Some("🏊 Swim"));
        assert_eq!(state.field_pairs["Activity"], json!("Swim"));
        assert_eq!(prompts.remaining(), 0);
    }

    #[tokio::test]
    async fn test_list_creation_failure() {
        let field = json!({"name": "Activity", "prompt": "suggester", "listPath": "a.md", "required": true});
        let mut cfg = single_field(field);
        let storage = MemoryStorage::new().fail_create("a.md");
        let prompts = ScriptedPrompts::new(vec![json!("Log")]);
        let err = run(&mut cfg, &prompts, &storage, &resolver()).await.unwrap_err();
        assert!(matches!(err, CaptureError::ListUnavailable { .. }));

        let mut cfg = single_field(json!({"name": "Activity", "prompt": "suggester", "listPath": "a.md"}));
        let prompts = ScriptedPrompts::new(vec![json!("Log")]);
        let (_, state) = run(&mut cfg, &prompts, &storage, &resolver()).await.unwrap();
        assert_eq!(state.field_pairs["Activity"], json!(""));
    }

    #[tokio::test]
    async fn test_list_outside_root() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage = FsStorage::new(dir.path());

        let mut cfg = single_field(json!({
            "name": "Activity", "prompt": "suggester", "listPath": "../lists/x.md", "write": true
        }));
        let prompts = ScriptedPrompts::new(vec![json!("Log")]);
        let mut state = CaptureState::default();
        FieldCapture::new(&prompts, &storage, &resolver())
            .run(&mut cfg, &mut state)
            .await
            .unwrap();
        assert_eq!(state.field_pairs["Activity"], json!(""));
        assert!(state.writeable_fields.is_empty());

        let mut cfg = single_field(json!({
            "name": "Activity", "prompt": "suggester", "listPath": "../lists/x.md", "required": true
        }));
        let prompts = ScriptedPrompts::new(vec![json!("Log")]);
        let err = FieldCapture::new(&prompts, &storage, &resolver())
            .run(&mut cfg, &mut CaptureState::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::ListUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_unsupported_prompt_and_missing_name() {
        let mut cfg = single_field(json!({"name": "A", "prompt": "slider"}));
        let prompts = ScriptedPrompts::new(vec![json!("Log")]);
        let err = run(&mut cfg, &prompts, &MemoryStorage::new(), &resolver())
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::UnsupportedPrompt { .. }));

        let mut cfg = single_field(json!({"prompt": "inputPrompt"}));
        let prompts = ScriptedPrompts::new(vec![json!("Log")]);
        let err = run(&mut cfg, &prompts, &MemoryStorage::new(), &resolver())
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::MissingFieldName { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_sanitized_names_keep_first_position() {
        let mut cfg = config(json!({
            "categories": { "Log": {
                "disableCommentField": true,
                "fields": [
                    {"name": "a,b", "prompt": "inputPrompt"},
                    {"name": "Other", "prompt": "inputPrompt"},
                    {"name": "ab", "prompt": "inputPrompt"}
                ]
            }}
        }));
        let prompts = ScriptedPrompts::new(vec![json!("Log"), json!("1"), json!("2"), json!("3")]);
        let (_, state) = run(&mut cfg, &prompts, &MemoryStorage::new(), &resolver())
            .await
            .unwrap();
        let keys: Vec<&String> = state.field_pairs.keys().collect();
        assert_eq!(keys, vec!["ab", "Other"]);
        assert_eq!(state.field_pairs["ab"], json!("3"));
    }

    #[tokio::test]
    async fn test_comment_field() {
        let mut cfg = config(json!({
            "categories": { "Log": {
                "name": "Daily log",
                "commentFieldFormat": "highlight",
                "commentFieldPrefix": "ignored",
                "commentFieldSuffix": true
            }}
        }));
        let prompts = ScriptedPrompts::new(vec![json!("Log"), json!("felt good ")]);
        let (_, state) = run(&mut cfg, &prompts, &MemoryStorage::new(), &resolver())
            .await
            .unwrap();
        assert_eq!(prompts.asked()[1], AskedPrompt::Text("Comment for Daily log".into()));
        assert_eq!(state.field_pairs[COMMENT_KEY], json!("felt good true"));
        assert_eq!(state.writeable_fields, vec!["==felt good true=="]);
    }

    #[tokio::test]
    async fn test_registry_mirrors_progress_on_abort() {
        let mut cfg = config(json!({
            "categories": { "Log": { "fields": [
                {"name": "First", "prompt": "inputPrompt", "write": true},
                {"name": "Second", "prompt": "inputPrompt", "required": true}
            ]}}
        }));
        let resolver = resolver();
        let prompts = ScriptedPrompts::new(vec![json!("Log"), json!("one")]);
        let result = run(&mut cfg, &prompts, &MemoryStorage::new(), &resolver).await;
        assert!(result.is_err());
        assert_eq!(
            resolver.registry().get("fieldPairs"),
            Some(json!({"First": "one"}))
        );
        assert_eq!(resolver.registry().get("writeableFields"), Some(json!(["one"])));
    }

    #[test]
    fn test_state_from_registry() {
        let registry = VariableRegistry::new();
        registry.set("fieldPairs", json!({"Mood": "ok"}));
        registry.set("writeableFields", json!(["ok"]));
        let state = CaptureState::from_registry(&registry);
        assert_eq!(state.field_pairs["Mood"], json!("ok"));
        assert_eq!(state.writeable_fields, vec!["ok"]);
    }
}
