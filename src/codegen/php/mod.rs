//! PHP code renderer
//!
//! Renders Doctrine entity and repository classes.

use minijinja::Environment;

use crate::codegen::declarations::{annotation_escape, php_escape};
use crate::codegen::{AnnotationStyle, GenerationRequest};
use crate::error::EntigenError;
use crate::writer::MarkerPatch;

/// Text whose presence marks a repository as already carrying its marker
pub const REPOSITORY_MARKER_TAG: &str = "@extends ServiceEntityRepository";

/// Building blocks of one entity class
#[derive(Debug, Clone, Default)]
pub struct EntityParts {
    /// Index declarations, in catalog order
    pub indexes: Vec<String>,
    pub properties: String,
    pub accessors: String,
}

/// Doctrine entity / repository renderer
pub struct PhpRenderer {
    env: Environment<'static>,
}

impl PhpRenderer {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_keep_trailing_newline(true);

        // Register templates
        env.add_template("entity", include_str!("templates/entity.php.jinja"))
            .expect("Failed to load entity template");
        env.add_template("repository", include_str!("templates/repository.php.jinja"))
            .expect("Failed to load repository template");

        Self { env }
    }
}

impl Default for PhpRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PhpRenderer {
    /// Render the entity class for `table_name`
    pub fn render_entity(
        &self,
        request: &GenerationRequest,
        table_name: &str,
        class_name: &str,
        parts: &EntityParts,
    ) -> Result<String, EntigenError> {
        let (unique_constraints, indexes): (Vec<&String>, Vec<&String>) = parts
            .indexes
            .iter()
            .partition(|declaration| declaration.starts_with("@ORM\\UniqueConstraint"));

        let (style, quoted_table) = match request.style {
            AnnotationStyle::Attribute => ("attribute", php_escape(table_name)),
            AnnotationStyle::Docblock => ("docblock", annotation_escape(table_name)),
        };

        let ctx = minijinja::context! {
            entity_namespace => &request.entity_namespace,
            repository_namespace => &request.repository_namespace,
            style => style,
            table_name => quoted_table,
            class_name => class_name,
            declarations => &parts.indexes,
            indexes => indexes,
            unique_constraints => unique_constraints,
            properties => &parts.properties,
            accessors => &parts.accessors,
        };

        self.render("entity", table_name, ctx)
    }

    /// Render the repository class that goes with `class_name`
    pub fn render_repository(
        &self,
        request: &GenerationRequest,
        table_name: &str,
        class_name: &str,
    ) -> Result<String, EntigenError> {
        let ctx = minijinja::context! {
            entity_namespace => &request.entity_namespace,
            repository_namespace => &request.repository_namespace,
            class_name => class_name,
            marker => repository_marker(class_name),
        };

        self.render("repository", table_name, ctx)
    }

    fn render(
        &self,
        template_name: &str,
        table_name: &str,
        ctx: minijinja::Value,
    ) -> Result<String, EntigenError> {
        let template = self
            .env
            .get_template(template_name)
            .map_err(|e| EntigenError::Render {
                table: table_name.to_string(),
                message: format!("Template error: {}", e),
            })?;

        template.render(ctx).map_err(|e| EntigenError::Render {
            table: table_name.to_string(),
            message: format!("Render error: {}", e),
        })
    }
}

/// Docblock declaring the repository's entity type
pub fn repository_marker(class_name: &str) -> String {
    format!(
        "/**
 * {tag}<{class}>
 *
 * @method {class}|null find($id, $lockMode = null, $lockVersion = null)
 * @method {class}|null findOneBy(array $criteria, array $orderBy = null)
 * @method {class}[]    findAll()
 * @method {class}[]    findBy(array $criteria, array $orderBy = null, $limit = null, $offset = null)
 */",
        tag = REPOSITORY_MARKER_TAG,
        class = class_name
    )
}

/// How an existing repository file is brought up to date
pub fn repository_patch(class_name: &str) -> MarkerPatch {
    MarkerPatch {
        detect: REPOSITORY_MARKER_TAG.to_string(),
        marker: repository_marker(class_name),
        anchor: format!("class {}Repository extends ServiceEntityRepository", class_name),
    }
}
