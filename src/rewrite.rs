use crate::config::NamespaceConfig;

/// Class prefix used internally by the upstream component library.
pub const INTERNAL_MARKER: &str = "el-";

/// Maps an extracted selector to the selector the project actually ships.
///
/// A custom processor replaces the default substitution entirely.
pub fn rewrite(selector: &str, config: &NamespaceConfig) -> String {
    if let Some(processor) = config.rewrite.as_ref() {
        return processor.call(selector, &config.namespace);
    }
    if config.namespace.is_empty() {
        return selector.to_string();
    }
    selector.replace(INTERNAL_MARKER, &format!("{}-", config.namespace))
}

#[cfg(test)]
mod tests {
    use super::rewrite;
    use crate::config::{NamespaceConfig, SelectorProcessor};

    #[test]
    fn passes_through_without_namespace() {
        let config = NamespaceConfig::new("", "ui");
        assert_eq!(
            rewrite(".el-input__inner:focus", &config),
            ".el-input__inner:focus"
        );
    }

    #[test]
    fn replaces_every_marker_occurrence() {
        let config = NamespaceConfig::new("ep", "lui");
        assert_eq!(
            rewrite(".el-input-group--prepend>.el-input__wrapper", &config),
            ".ep-input-group--prepend>.ep-input__wrapper"
        );
    }

    #[test]
    fn marker_match_is_case_sensitive() {
        let config = NamespaceConfig::new("ep", "ui");
        assert_eq!(rewrite(".EL-input .El-x", &config), ".EL-input .El-x");
    }

    #[test]
    fn custom_processor_overrides_default() {
        let mut config = NamespaceConfig::new("ep", "ui");
        config.rewrite = Some(SelectorProcessor::new(|selector, namespace| {
            selector.replace("el-", &format!("{}-x-", namespace))
        }));
        assert_eq!(rewrite(".el-button", &config), ".ep-x-button");
    }

    #[test]
    fn custom_processor_runs_even_without_namespace() {
        let mut config = NamespaceConfig::new("", "ui");
        config.rewrite = Some(SelectorProcessor::new(|selector, namespace| {
            format!("{}[{}]", selector, namespace)
        }));
        assert_eq!(rewrite(".a", &config), ".a[]");
    }
}
