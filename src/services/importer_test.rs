use super::*;
use serde_json::json;
use std::sync::Mutex;

/// In-memory sink recording every insert.
#[derive(Default)]
struct MockSink {
    properties: Mutex<Vec<(Uuid, NewProperty)>>,
    groups: Mutex<Vec<(Uuid, NewUserGroup)>>,
    users: Mutex<Vec<NewUser>>,
    projects: Mutex<Vec<(Uuid, NewImportedProject)>>,
    designs: Mutex<Vec<(Uuid, NewImportedDesign)>>,
    configs: Mutex<Vec<NewPanelConfiguration>>,
    /// Property name whose insert should fail.
    reject_property: Option<&'static str>,
}

#[async_trait]
impl ImportSink for MockSink {
    async fn find_property(&self, name: &str) -> Result<Option<Uuid>, ImportSinkError> {
        let properties = self.properties.lock().unwrap();
        Ok(properties.iter().find(|(_, p)| p.name == name).map(|(id, _)| *id))
    }

    async fn find_user_group(&self, property_id: Uuid, name: &str) -> Result<Option<Uuid>, ImportSinkError> {
        let groups = self.groups.lock().unwrap();
        Ok(groups.iter().find(|(_, g)| g.property_id == property_id && g.name == name).map(|(id, _)| *id))
    }

    async fn insert_property(&self, property: &NewProperty) -> Result<Uuid, ImportSinkError> {
        if self.reject_property == Some(property.name.as_str()) {
            return Err(ImportSinkError::Rejected(format!("duplicate property {}", property.name)));
        }
        let id = Uuid::new_v4();
        self.properties.lock().unwrap().push((id, property.clone()));
        Ok(id)
    }

    async fn insert_user_group(&self, group: &NewUserGroup) -> Result<Uuid, ImportSinkError> {
        let id = Uuid::new_v4();
        self.groups.lock().unwrap().push((id, group.clone()));
        Ok(id)
    }

    async fn insert_user(&self, user: &NewUser) -> Result<Uuid, ImportSinkError> {
        self.users.lock().unwrap().push(user.clone());
        Ok(Uuid::new_v4())
    }

    async fn insert_project(&self, project: &NewImportedProject) -> Result<Uuid, ImportSinkError> {
        let id = Uuid::new_v4();
        self.projects.lock().unwrap().push((id, project.clone()));
        Ok(id)
    }

    async fn insert_design(&self, design: &NewImportedDesign) -> Result<Uuid, ImportSinkError> {
        let id = Uuid::new_v4();
        self.designs.lock().unwrap().push((id, design.clone()));
        Ok(id)
    }

    async fn insert_panel_configuration(&self, config: &NewPanelConfiguration) -> Result<Uuid, ImportSinkError> {
        self.configs.lock().unwrap().push(config.clone());
        Ok(Uuid::new_v4())
    }
}

// =============================================================================
// run_import
// =============================================================================

#[tokio::test]
async fn partial_import_is_still_success() {
    let sink = MockSink::default();
    let doc = json!({
        "properties": [{"name": "Harbor Hotel"}, {"name": "City Suites"}],
        "projects": [{"property_name": "Harbor Hotel", "project_code": "HH-1"}]
    });

    let report = run_import(&sink, &doc).await;

    assert!(report.success);
    assert_eq!(report.properties_created, 2);
    assert_eq!(report.projects_created, 0);
    assert!(!report.errors.is_empty());
    assert!(report.errors.iter().any(|e| e.contains("project_name")));
    assert_eq!(report.errors[0], "projects[0]: missing required field `project_name`");
}

#[tokio::test]
async fn full_document_fans_out_in_dependency_order() {
    let sink = MockSink::default();
    let doc = json!({
        "import_metadata": {"source": "crm", "version": 2},
        "properties": [{"name": "Harbor Hotel", "region": "EU"}],
        "user_groups": [{"name": "Designers", "property_name": "Harbor Hotel", "can_edit": false}],
        "users": [{"email": "Ana@Harbor.com", "user_group": "Designers", "property_name": "Harbor Hotel"}],
        "projects": [{
            "project_name": "Tower A",
            "property_name": "Harbor Hotel",
            "boq_quantity": 40,
            "designs": [{
                "design_name": "Guest Room (rev2)",
                "panel_configurations": [
                    {"panel_type": "sp", "quantity": 3},
                    {"panel_type": "TAG", "position": 5, "config": {"dimension": "tall"}}
                ]
            }]
        }]
    });

    let report = run_import(&sink, &doc).await;

    assert!(report.success, "{:?}", report.errors);
    assert!(report.errors.is_empty(), "{:?}", report.errors);
    assert_eq!(
        (report.properties_created, report.user_groups_created, report.users_created),
        (1, 1, 1)
    );
    assert_eq!((report.projects_created, report.designs_created, report.panel_configurations_created), (1, 1, 2));
    assert_eq!(report.metadata, Some(json!({"source": "crm", "version": 2})));

    let (property_id, _) = sink.properties.lock().unwrap()[0].clone();
    let (group_id, group) = sink.groups.lock().unwrap()[0].clone();
    assert_eq!(group.property_id, property_id);
    assert!(!group.can_edit);

    let user = sink.users.lock().unwrap()[0].clone();
    assert_eq!(user.email, "ana@harbor.com");
    assert_eq!(user.ug_id, Some(group_id));

    let (_, design) = sink.designs.lock().unwrap()[0].clone();
    assert_eq!(design.base_name, "Guest Room");
    assert_eq!(design.revision, 2);
    assert_eq!(design.total_quantity, 4);

    let configs = sink.configs.lock().unwrap().clone();
    assert_eq!(configs[0].panel_type, "SP");
    assert_eq!(configs[0].position, 0);
    assert_eq!(configs[1].position, 5);
    assert_eq!(configs[1].config, json!({"dimension": "tall"}));
}

#[tokio::test]
async fn unknown_property_reference_skips_record_and_children() {
    let sink = MockSink::default();
    let doc = json!({
        "projects": [{
            "project_name": "Orphan",
            "property_name": "Nowhere",
            "designs": [{"design_name": "Lobby"}]
        }]
    });

    let report = run_import(&sink, &doc).await;

    assert!(report.success);
    assert_eq!(report.projects_created, 0);
    assert_eq!(report.designs_created, 0);
    assert_eq!(report.errors, vec!["projects[0]: unknown property `Nowhere`".to_owned()]);
}

#[tokio::test]
async fn failed_insert_is_recorded_and_import_continues() {
    let sink = MockSink { reject_property: Some("Dup"), ..MockSink::default() };
    let doc = json!({"properties": [{"name": "Dup"}, {"name": "Fresh"}]});

    let report = run_import(&sink, &doc).await;

    assert_eq!(report.properties_created, 1);
    assert_eq!(report.errors, vec!["properties[0]: duplicate property Dup".to_owned()]);
}

#[tokio::test]
async fn nested_missing_fields_carry_their_path() {
    let sink = MockSink::default();
    let doc = json!({
        "properties": [{"name": "P"}],
        "projects": [{
            "project_name": "Tower",
            "property_name": "P",
            "designs": [
                {"panel_configurations": []},
                {"design_name": "Spa", "panel_configurations": [{"quantity": 2}]}
            ]
        }]
    });

    let report = run_import(&sink, &doc).await;

    assert_eq!(report.designs_created, 1);
    assert_eq!(report.panel_configurations_created, 0);
    assert_eq!(
        report.errors,
        vec![
            "projects[0].designs[0]: missing required field `design_name`".to_owned(),
            "projects[0].designs[1].panel_configurations[0]: missing required field `panel_type`".to_owned(),
        ]
    );
}

#[tokio::test]
async fn overflowing_panel_quantities_reject_the_design_only() {
    let sink = MockSink::default();
    let doc = json!({
        "properties": [{"name": "Harbor Hotel"}],
        "projects": [{
            "project_name": "Tower",
            "property_name": "Harbor Hotel",
            "designs": [
                {"design_name": "Huge", "panel_configurations": [
                    {"panel_type": "SP", "quantity": 2_000_000_000},
                    {"panel_type": "SP", "quantity": 2_000_000_000}
                ]},
                {"design_name": "Lobby", "panel_configurations": [{"panel_type": "SP", "quantity": 3}]}
            ]
        }]
    });

    let report = run_import(&sink, &doc).await;

    assert!(report.success);
    assert_eq!(report.designs_created, 1);
    assert_eq!(report.panel_configurations_created, 1);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].starts_with("projects[0].designs[0]: panel quantities exceed"));
    let designs = sink.designs.lock().unwrap();
    assert_eq!(designs[0].1.design_name, "Lobby");
    assert_eq!(designs[0].1.total_quantity, 3);
}

#[tokio::test]
async fn non_document_is_a_failure() {
    let sink = MockSink::default();
    for doc in [json!([1, 2]), json!({"something": []}), json!("text")] {
        let report = run_import(&sink, &doc).await;
        assert!(!report.success);
        assert_eq!(report.errors.len(), 1);
    }
}

// =============================================================================
// display name & preview
// =============================================================================

#[test]
fn display_name_follows_accepted_shapes() {
    assert_eq!(import_display_name(&json!({"project_name": "Tower"})), "Tower");
    assert_eq!(import_display_name(&json!({"properties": [{"name": "Harbor"}]})), "Harbor");
    assert_eq!(import_display_name(&json!({"Property name": "Legacy"})), "Legacy");
    assert_eq!(import_display_name(&json!({})), FALLBACK_DISPLAY_NAME);
}

#[test]
fn preview_counts_without_writing() {
    let doc = json!({
        "properties": [{"name": "P"}, {}],
        "users": [{"email": "a@b.c"}],
        "projects": [{
            "project_name": "T",
            "property_name": "P",
            "designs": [{"design_name": "D", "panel_configurations": [{"panel_type": "SP"}, {"panel_type": "TAG"}]}]
        }]
    });

    let preview = preview(&doc);

    assert_eq!(preview.display_name, "P");
    assert_eq!((preview.properties, preview.users, preview.projects), (2, 1, 1));
    assert_eq!((preview.designs, preview.panel_configurations), (1, 2));
    assert_eq!(preview.missing_fields, vec!["properties[1]: missing required field `name`".to_owned()]);
}
