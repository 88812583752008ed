use crate::error::{OgpError, Result};
use std::path::Path;

const BUILTIN_TEMPLATE: &str = include_str!("../templates/game-template.html");
const GAME_ID_PLACEHOLDER: &str = "{{GAME_ID}}";

/// Values substituted into a game page.
#[derive(Debug, Clone)]
pub struct GamePage<'a> {
    pub name: &'a str,
    pub points_per_jump: u32,
    pub lives: u32,
    pub api_key: &'a str,
    pub platform_api_url: &'a str,
    /// Empty until the platform has assigned an id.
    pub game_id: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct GameTemplate {
    source: String,
}

impl GameTemplate {
    pub fn builtin() -> Self {
        Self {
            source: BUILTIN_TEMPLATE.to_string(),
        }
    }

    pub fn from_source(source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        if !source.contains(GAME_ID_PLACEHOLDER) {
            return Err(OgpError::template(format!(
                "template must contain the {} placeholder",
                GAME_ID_PLACEHOLDER
            )));
        }
        Ok(Self { source })
    }

    pub async fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let source = tokio::fs::read_to_string(path).await.map_err(|e| {
                    OgpError::template(format!("Failed to read {}: {}", path.display(), e))
                })?;
                tracing::info!("Using game template {}", path.display());
                Self::from_source(source)
            }
            None => Ok(Self::builtin()),
        }
    }

    /// Fill placeholders in a single pass, so substituted values are never
    /// scanned again. Unknown placeholders are left as they are.
    pub fn render(&self, page: &GamePage<'_>) -> String {
        let mut out = String::with_capacity(self.source.len());
        let mut rest = self.source.as_str();

        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];

            let value = after
                .find("}}")
                .and_then(|end| page.value(&after[..end]).map(|value| (end, value)));
            match value {
                Some((end, value)) => {
                    out.push_str(&value);
                    rest = &after[end + 2..];
                }
                None => {
                    out.push_str("{{");
                    rest = after;
                }
            }
        }

        out.push_str(rest);
        out
    }
}

impl GamePage<'_> {
    fn value(&self, placeholder: &str) -> Option<String> {
        let value = match placeholder {
            "GAME_NAME" => escape_html(self.name),
            "POINTS_PER_JUMP" => self.points_per_jump.to_string(),
            "LIVES" => self.lives.to_string(),
            "OGP_API_KEY" => self.api_key.to_string(),
            "PLATFORM_API_URL" => self.platform_api_url.to_string(),
            "GAME_ID" => self.game_id.unwrap_or_default().to_string(),
            _ => return None,
        };
        Some(value)
    }
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(game_id: Option<&str>) -> GamePage<'_> {
        GamePage {
            name: "Sky <Jumper>",
            points_per_jump: 15,
            lives: 4,
            api_key: "pk_test",
            platform_api_url: "http://localhost:3001/api",
            game_id,
        }
    }

    #[test]
    fn test_render_builtin() {
        let html = GameTemplate::builtin().render(&page(Some("game-123")));

        assert!(html.contains("Sky &lt;Jumper&gt;"));
        assert!(html.contains(r#"const GAME_ID = "game-123";"#));
        assert!(html.contains(r#"Number("15")"#));
        assert!(html.contains("pk_test"));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn test_render_without_id() {
        let html = GameTemplate::builtin().render(&page(None));
        assert!(html.contains(r#"const GAME_ID = "";"#));
    }

    #[test]
    fn test_custom_template_needs_id_placeholder() {
        assert!(GameTemplate::from_source("<h1>{{GAME_NAME}}</h1>").is_err());

        let template = GameTemplate::from_source("{{GAME_NAME}}:{{GAME_ID}}").unwrap();
        assert_eq!(template.render(&page(Some("g9"))), "Sky &lt;Jumper&gt;:g9");
    }

    #[test]
    fn test_name_placeholders_stay_literal() {
        let template = GameTemplate::from_source(
            "<title>{{GAME_NAME}}</title>{{GAME_ID}} {{UNKNOWN}}",
        )
        .unwrap();
        let mut page = page(Some("g1"));
        page.name = "{{OGP_API_KEY}}";

        assert_eq!(
            template.render(&page),
            "<title>{{OGP_API_KEY}}</title>g1 {{UNKNOWN}}"
        );
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let result = GameTemplate::load(Some(Path::new("/nonexistent/template.html"))).await;
        assert!(matches!(result, Err(OgpError::Template(_))));
    }
}
