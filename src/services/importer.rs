//! Bulk JSON importer.
//!
//! DESIGN
//! ======
//! An import document nests `properties[]`, `user_groups[]`, `users[]`, and
//! `projects[]` (each with `designs[]`, each with optional
//! `panel_configurations[]`). Records are inserted one at a time in
//! dependency order. Validation is shallow: a record missing a required
//! string field, pointing at an unknown parent, or failing to insert adds a
//! line to `errors` and the import moves on. Children of a rejected record
//! are skipped with it.
//!
//! Writes go through the `ImportSink` trait so the fan-out can be exercised
//! without a database.
//!
//! ERROR HANDLING
//! ==============
//! `success` is `false` only when the document is not an object or carries
//! none of the known arrays. Partial imports are successful imports.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::revision;

const SECTIONS: [&str; 4] = ["properties", "user_groups", "users", "projects"];
const FALLBACK_DISPLAY_NAME: &str = "Imported data";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub success: bool,
    pub properties_created: usize,
    pub user_groups_created: usize,
    pub users_created: usize,
    pub projects_created: usize,
    pub designs_created: usize,
    pub panel_configurations_created: usize,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// Record counts of a document, without writing anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportPreview {
    pub display_name: String,
    pub properties: usize,
    pub user_groups: usize,
    pub users: usize,
    pub projects: usize,
    pub designs: usize,
    pub panel_configurations: usize,
    pub missing_fields: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ImportSinkError {
    #[error("{0}")]
    Rejected(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProperty {
    pub name: String,
    pub region: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUserGroup {
    pub property_id: Uuid,
    pub name: String,
    pub can_edit: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub email: String,
    pub name: Option<String>,
    pub ug_id: Option<Uuid>,
    pub is_admin: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewImportedProject {
    pub property_id: Uuid,
    pub project_name: String,
    pub project_code: Option<String>,
    pub boq_quantity: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewImportedDesign {
    pub project_id: Uuid,
    pub property_id: Uuid,
    pub design_name: String,
    pub base_name: String,
    pub revision: i32,
    pub design_data: Value,
    pub total_quantity: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPanelConfiguration {
    pub design_id: Uuid,
    pub position: i32,
    pub panel_type: String,
    pub quantity: i32,
    pub config: Value,
}

/// Destination of an import.
#[async_trait]
pub trait ImportSink: Send + Sync {
    async fn find_property(&self, name: &str) -> Result<Option<Uuid>, ImportSinkError>;
    async fn find_user_group(&self, property_id: Uuid, name: &str) -> Result<Option<Uuid>, ImportSinkError>;
    async fn insert_property(&self, property: &NewProperty) -> Result<Uuid, ImportSinkError>;
    /// Insert a group and grant it access to its property.
    async fn insert_user_group(&self, group: &NewUserGroup) -> Result<Uuid, ImportSinkError>;
    async fn insert_user(&self, user: &NewUser) -> Result<Uuid, ImportSinkError>;
    async fn insert_project(&self, project: &NewImportedProject) -> Result<Uuid, ImportSinkError>;
    async fn insert_design(&self, design: &NewImportedDesign) -> Result<Uuid, ImportSinkError>;
    async fn insert_panel_configuration(&self, config: &NewPanelConfiguration) -> Result<Uuid, ImportSinkError>;
}

// =============================================================================
// FIELD ACCESS
// =============================================================================

fn str_field<'a>(record: &'a Value, field: &str) -> Option<&'a str> {
    record.get(field).and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty())
}

fn required<'a>(record: &'a Value, field: &str, path: &str) -> Result<&'a str, String> {
    str_field(record, field).ok_or_else(|| format!("{path}: missing required field `{field}`"))
}

fn owned_field(record: &Value, field: &str) -> Option<String> {
    str_field(record, field).map(str::to_owned)
}

fn int_field(record: &Value, field: &str) -> Option<i32> {
    record.get(field).and_then(Value::as_i64).and_then(|n| i32::try_from(n).ok())
}

fn bool_field(record: &Value, field: &str) -> Option<bool> {
    record.get(field).and_then(Value::as_bool)
}

fn array<'a>(record: &'a Value, field: &str) -> &'a [Value] {
    record.get(field).and_then(Value::as_array).map_or(&[], Vec::as_slice)
}

/// Display name for a document in any of the accepted shapes: a top-level
/// `project_name`, the first property's `name`, or a `"Property name"` key.
#[must_use]
pub fn import_display_name(doc: &Value) -> String {
    str_field(doc, "project_name")
        .or_else(|| array(doc, "properties").first().and_then(|p| str_field(p, "name")))
        .or_else(|| str_field(doc, "Property name"))
        .unwrap_or(FALLBACK_DISPLAY_NAME)
        .to_owned()
}

fn is_import_document(doc: &Value) -> Option<&Map<String, Value>> {
    let object = doc.as_object()?;
    SECTIONS.iter().any(|key| object.get(*key).is_some_and(Value::is_array)).then_some(object)
}

/// Count records and list missing required fields without writing.
#[must_use]
pub fn preview(doc: &Value) -> ImportPreview {
    let mut out = ImportPreview { display_name: import_display_name(doc), ..ImportPreview::default() };
    let mut missing = |result: Result<&str, String>| {
        if let Err(e) = result {
            out.missing_fields.push(e);
        }
    };

    for (i, p) in array(doc, "properties").iter().enumerate() {
        missing(required(p, "name", &format!("properties[{i}]")));
    }
    for (i, g) in array(doc, "user_groups").iter().enumerate() {
        let path = format!("user_groups[{i}]");
        missing(required(g, "name", &path));
        missing(required(g, "property_name", &path));
    }
    for (i, u) in array(doc, "users").iter().enumerate() {
        missing(required(u, "email", &format!("users[{i}]")));
    }
    for (i, project) in array(doc, "projects").iter().enumerate() {
        let path = format!("projects[{i}]");
        missing(required(project, "project_name", &path));
        missing(required(project, "property_name", &path));
        for (j, design) in array(project, "designs").iter().enumerate() {
            let path = format!("{path}.designs[{j}]");
            missing(required(design, "design_name", &path));
            for (k, config) in array(design, "panel_configurations").iter().enumerate() {
                missing(required(config, "panel_type", &format!("{path}.panel_configurations[{k}]")));
            }
        }
    }

    out.properties = array(doc, "properties").len();
    out.user_groups = array(doc, "user_groups").len();
    out.users = array(doc, "users").len();
    out.projects = array(doc, "projects").len();
    let designs = array(doc, "projects").iter().flat_map(|p| array(p, "designs"));
    out.designs = designs.clone().count();
    out.panel_configurations = designs.map(|d| array(d, "panel_configurations").len()).sum();
    out
}

// =============================================================================
// IMPORT
// =============================================================================

struct Importer<'a> {
    sink: &'a dyn ImportSink,
    report: ImportReport,
    properties: HashMap<String, Uuid>,
}

impl Importer<'_> {
    fn fail(&mut self, message: String) {
        warn!(error = %message, "import record rejected");
        self.report.errors.push(message);
    }

    async fn resolve_property(&mut self, name: &str, path: &str) -> Option<Uuid> {
        if let Some(id) = self.properties.get(name) {
            return Some(*id);
        }
        match self.sink.find_property(name).await {
            Ok(Some(id)) => {
                self.properties.insert(name.to_owned(), id);
                Some(id)
            }
            Ok(None) => {
                self.fail(format!("{path}: unknown property `{name}`"));
                None
            }
            Err(e) => {
                self.fail(format!("{path}: {e}"));
                None
            }
        }
    }

    async fn import_properties(&mut self, records: &[Value]) {
        for (i, record) in records.iter().enumerate() {
            let path = format!("properties[{i}]");
            let name = match required(record, "name", &path) {
                Ok(name) => name.to_owned(),
                Err(e) => {
                    self.fail(e);
                    continue;
                }
            };
            let property =
                NewProperty { name: name.clone(), region: owned_field(record, "region"), address: owned_field(record, "address") };
            match self.sink.insert_property(&property).await {
                Ok(id) => {
                    self.properties.insert(name, id);
                    self.report.properties_created += 1;
                }
                Err(e) => self.fail(format!("{path}: {e}")),
            }
        }
    }

    async fn import_user_groups(&mut self, records: &[Value]) {
        for (i, record) in records.iter().enumerate() {
            let path = format!("user_groups[{i}]");
            let (name, property_name) =
                match (required(record, "name", &path), required(record, "property_name", &path)) {
                    (Ok(name), Ok(property)) => (name.to_owned(), property.to_owned()),
                    (Err(e), _) | (_, Err(e)) => {
                        self.fail(e);
                        continue;
                    }
                };
            let Some(property_id) = self.resolve_property(&property_name, &path).await else {
                continue;
            };
            let group = NewUserGroup { property_id, name, can_edit: bool_field(record, "can_edit").unwrap_or(true) };
            match self.sink.insert_user_group(&group).await {
                Ok(_) => self.report.user_groups_created += 1,
                Err(e) => self.fail(format!("{path}: {e}")),
            }
        }
    }

    async fn import_users(&mut self, records: &[Value]) {
        for (i, record) in records.iter().enumerate() {
            let path = format!("users[{i}]");
            let email = match required(record, "email", &path) {
                Ok(email) => email.to_lowercase(),
                Err(e) => {
                    self.fail(e);
                    continue;
                }
            };

            let mut ug_id = None;
            if let (Some(group), Some(property_name)) = (str_field(record, "user_group"), str_field(record, "property_name")) {
                let Some(property_id) = self.resolve_property(property_name, &path).await else {
                    continue;
                };
                match self.sink.find_user_group(property_id, group).await {
                    Ok(Some(id)) => ug_id = Some(id),
                    Ok(None) => {
                        self.fail(format!("{path}: unknown user group `{group}`"));
                        continue;
                    }
                    Err(e) => {
                        self.fail(format!("{path}: {e}"));
                        continue;
                    }
                }
            }

            let user = NewUser {
                email,
                name: owned_field(record, "name"),
                ug_id,
                is_admin: bool_field(record, "is_admin").unwrap_or(false),
            };
            match self.sink.insert_user(&user).await {
                Ok(_) => self.report.users_created += 1,
                Err(e) => self.fail(format!("{path}: {e}")),
            }
        }
    }

    async fn import_projects(&mut self, records: &[Value]) {
        for (i, record) in records.iter().enumerate() {
            let path = format!("projects[{i}]");
            let (project_name, property_name) =
                match (required(record, "project_name", &path), required(record, "property_name", &path)) {
                    (Ok(project), Ok(property)) => (project.to_owned(), property.to_owned()),
                    (Err(e), _) | (_, Err(e)) => {
                        self.fail(e);
                        continue;
                    }
                };
            let Some(property_id) = self.resolve_property(&property_name, &path).await else {
                continue;
            };
            let project = NewImportedProject {
                property_id,
                project_name,
                project_code: owned_field(record, "project_code"),
                boq_quantity: int_field(record, "boq_quantity"),
            };
            let project_id = match self.sink.insert_project(&project).await {
                Ok(id) => id,
                Err(e) => {
                    self.fail(format!("{path}: {e}"));
                    continue;
                }
            };
            self.report.projects_created += 1;

            for (j, design) in array(record, "designs").iter().enumerate() {
                self.import_design(design, project_id, property_id, &format!("{path}.designs[{j}]")).await;
            }
        }
    }

    async fn import_design(&mut self, record: &Value, project_id: Uuid, property_id: Uuid, path: &str) {
        let design_name = match required(record, "design_name", path) {
            Ok(name) => name.to_owned(),
            Err(e) => {
                self.fail(e);
                return;
            }
        };
        let configs = array(record, "panel_configurations");
        let Some(total_quantity) = configs
            .iter()
            .try_fold(0_i32, |total, c| total.checked_add(int_field(c, "quantity").unwrap_or(1).max(1)))
        else {
            self.fail(format!("{path}: panel quantities exceed {}", i32::MAX));
            return;
        };
        let (base, revision) = revision::split_revision(&design_name);
        let design = NewImportedDesign {
            project_id,
            property_id,
            base_name: base.to_owned(),
            revision: i32::try_from(revision.unwrap_or(0)).unwrap_or(i32::MAX),
            design_name: design_name.clone(),
            design_data: record.get("design_data").cloned().unwrap_or_else(|| Value::Array(Vec::new())),
            total_quantity,
        };
        let design_id = match self.sink.insert_design(&design).await {
            Ok(id) => id,
            Err(e) => {
                self.fail(format!("{path}: {e}"));
                return;
            }
        };
        self.report.designs_created += 1;

        for (k, config) in configs.iter().enumerate() {
            let path = format!("{path}.panel_configurations[{k}]");
            let panel_type = match required(config, "panel_type", &path) {
                Ok(t) => t.to_ascii_uppercase(),
                Err(e) => {
                    self.fail(e);
                    continue;
                }
            };
            let row = NewPanelConfiguration {
                design_id,
                position: int_field(config, "position").unwrap_or_else(|| i32::try_from(k).unwrap_or(i32::MAX)),
                panel_type,
                quantity: int_field(config, "quantity").unwrap_or(1).max(1),
                config: config.get("config").cloned().unwrap_or_else(|| Value::Object(Map::new())),
            };
            match self.sink.insert_panel_configuration(&row).await {
                Ok(_) => self.report.panel_configurations_created += 1,
                Err(e) => self.fail(format!("{path}: {e}")),
            }
        }
    }
}

/// Import a document into `sink`, one record at a time.
pub async fn run_import(sink: &dyn ImportSink, doc: &Value) -> ImportReport {
    let Some(object) = is_import_document(doc) else {
        return ImportReport {
            success: false,
            errors: vec![format!("document must be an object with at least one of: {}", SECTIONS.join(", "))],
            ..ImportReport::default()
        };
    };

    let mut importer = Importer {
        sink,
        report: ImportReport { success: true, metadata: object.get("import_metadata").cloned(), ..ImportReport::default() },
        properties: HashMap::new(),
    };
    importer.import_properties(array(doc, "properties")).await;
    importer.import_user_groups(array(doc, "user_groups")).await;
    importer.import_users(array(doc, "users")).await;
    importer.import_projects(array(doc, "projects")).await;

    let report = importer.report;
    info!(
        properties = report.properties_created,
        user_groups = report.user_groups_created,
        users = report.users_created,
        projects = report.projects_created,
        designs = report.designs_created,
        panel_configurations = report.panel_configurations_created,
        errors = report.errors.len(),
        "import finished"
    );
    report
}

// =============================================================================
// POSTGRES SINK
// =============================================================================

pub struct PgImportSink {
    pool: PgPool,
}

impl PgImportSink {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ImportSink for PgImportSink {
    async fn find_property(&self, name: &str) -> Result<Option<Uuid>, ImportSinkError> {
        Ok(sqlx::query_scalar("SELECT id FROM property WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_group(&self, property_id: Uuid, name: &str) -> Result<Option<Uuid>, ImportSinkError> {
        Ok(sqlx::query_scalar("SELECT id FROM ug WHERE property_id = $1 AND name = $2")
            .bind(property_id)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert_property(&self, property: &NewProperty) -> Result<Uuid, ImportSinkError> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO property (id, name, region, address) VALUES ($1, $2, $3, $4)")
            .bind(id)
            .bind(&property.name)
            .bind(&property.region)
            .bind(&property.address)
            .execute(&self.pool)
            .await?;
        Ok(id)
    }

    async fn insert_user_group(&self, group: &NewUserGroup) -> Result<Uuid, ImportSinkError> {
        let id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT INTO ug (id, name, property_id) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(&group.name)
            .bind(group.property_id)
            .execute(tx.as_mut())
            .await?;
        sqlx::query("INSERT INTO ug_property_access (ug_id, property_id, can_edit) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(group.property_id)
            .bind(group.can_edit)
            .execute(tx.as_mut())
            .await?;
        tx.commit().await?;
        Ok(id)
    }

    async fn insert_user(&self, user: &NewUser) -> Result<Uuid, ImportSinkError> {
        let id = Uuid::new_v4();
        let inserted = sqlx::query(
            "INSERT INTO users (id, email, name, ug_id, is_admin) VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (email) DO NOTHING",
        )
        .bind(id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.ug_id)
        .bind(user.is_admin)
        .execute(&self.pool)
        .await?;
        if inserted.rows_affected() == 0 {
            return Err(ImportSinkError::Rejected(format!("user {} already exists", user.email)));
        }
        Ok(id)
    }

    async fn insert_project(&self, project: &NewImportedProject) -> Result<Uuid, ImportSinkError> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO user_projects (id, property_id, project_name, project_code, boq_quantity, created_by)
             VALUES ($1, $2, $3, $4, $5, 'import')",
        )
        .bind(id)
        .bind(project.property_id)
        .bind(&project.project_name)
        .bind(&project.project_code)
        .bind(project.boq_quantity)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    async fn insert_design(&self, design: &NewImportedDesign) -> Result<Uuid, ImportSinkError> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO user_designs
                (id, project_id, property_id, design_name, base_name, revision, design_data, total_quantity, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'import')",
        )
        .bind(id)
        .bind(design.project_id)
        .bind(design.property_id)
        .bind(&design.design_name)
        .bind(&design.base_name)
        .bind(design.revision)
        .bind(&design.design_data)
        .bind(design.total_quantity)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    async fn insert_panel_configuration(&self, config: &NewPanelConfiguration) -> Result<Uuid, ImportSinkError> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO panel_configurations (id, design_id, position, panel_type, quantity, config)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(id)
        .bind(config.design_id)
        .bind(config.position)
        .bind(&config.panel_type)
        .bind(config.quantity)
        .bind(&config.config)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }
}

#[cfg(test)]
#[path = "importer_test.rs"]
mod tests;
