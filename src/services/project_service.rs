use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::error_handling::{AppError, AppResult, LogHelper};
use super::gateway::ProjectGateway;
use super::list_state::ListState;
use crate::domain::project::{
    ExtraField, NewProject, Project, ProjectId, ProjectPatch, build_extra_data, normalize_extra_key,
};

pub const PROJECT_CREATED: &str = "Project created.";
pub const PROJECT_UPDATED: &str = "Project updated.";
pub const PROJECT_DELETED: &str = "Project deleted.";
pub const PROJECT_FIELDS_REQUIRED: &str = "Project name and website URL are required.";

/// Editable copy of a project. Only fields that differ from the loaded record
/// end up in the submitted patch; a blanked name or URL counts as unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectEditForm {
    original: Project,
    pub name: String,
    pub website_url: String,
    pub extra_fields: Vec<ExtraField>,
    pub add_user_email: String,
}

impl ProjectEditForm {
    pub fn from_project(project: &Project) -> Self {
        let extra_fields = project
            .extra_data
            .iter()
            .map(|(key, value)| ExtraField::new(normalize_extra_key(key), value.clone()))
            .collect();
        Self {
            original: project.clone(),
            name: project.name.clone(),
            website_url: project.website_url.clone(),
            extra_fields,
            add_user_email: String::new(),
        }
    }

    pub fn id(&self) -> ProjectId {
        self.original.id
    }

    pub fn original(&self) -> &Project {
        &self.original
    }

    pub fn add_field(&mut self) {
        self.extra_fields.push(ExtraField::default());
    }

    /// Sets `key`/`value` for the row at `index`, appending rows as needed.
    pub fn set_field(&mut self, index: usize, key: &str, value: &str) {
        if index >= self.extra_fields.len() {
            self.extra_fields.resize(index + 1, ExtraField::default());
        }
        self.extra_fields[index] = ExtraField::new(key, value);
    }

    pub fn remove_field(&mut self, index: usize) -> Option<ExtraField> {
        (index < self.extra_fields.len()).then(|| self.extra_fields.remove(index))
    }

    /// Upserts by normalized key.
    pub fn upsert_field(&mut self, key: &str, value: &str) {
        let normalized = normalize_extra_key(key);
        match self
            .extra_fields
            .iter_mut()
            .find(|f| normalize_extra_key(&f.key) == normalized)
        {
            Some(field) => field.value = value.to_string(),
            None => self.extra_fields.push(ExtraField::new(normalized, value)),
        }
    }

    pub fn to_patch(&self) -> ProjectPatch {
        let changed = |edited: &str, original: &str| {
            let edited = edited.trim();
            (!edited.is_empty() && edited != original).then(|| edited.to_string())
        };
        let extra_data = build_extra_data(&self.extra_fields);
        let email = self.add_user_email.trim();

        ProjectPatch {
            name: changed(&self.name, &self.original.name),
            website_url: changed(&self.website_url, &self.original.website_url),
            extra_data: (extra_data != self.original.extra_data).then_some(extra_data),
            add_user_email: (!email.is_empty()).then(|| email.to_string()),
        }
    }
}

/// Project list plus the create/update/delete flows.
///
/// Creating re-fetches the whole list so server-computed fields such as
/// `assets_count` stay authoritative. Deleting only drops the entry locally.
pub struct ProjectService {
    gateway: Arc<dyn ProjectGateway>,
    projects: ListState<Project>,
}

impl ProjectService {
    pub fn new(gateway: Arc<dyn ProjectGateway>) -> Self {
        Self {
            gateway,
            projects: ListState::new(),
        }
    }

    pub fn projects(&self) -> &ListState<Project> {
        &self.projects
    }

    pub fn projects_mut(&mut self) -> &mut ListState<Project> {
        &mut self.projects
    }

    #[instrument(skip(self))]
    pub async fn refresh(&mut self) -> AppResult<()> {
        let projects = self.gateway.list_projects().await.map_err(|e| {
            LogHelper::log_request_failure("list_projects", &e);
            AppError::Request(e)
        })?;
        info!(count = projects.len(), "Loaded projects");
        self.projects.set_items(projects);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn create(&mut self, name: &str, website_url: &str) -> AppResult<()> {
        let (name, website_url) = (name.trim(), website_url.trim());
        if name.is_empty() || website_url.is_empty() {
            LogHelper::log_validation_failure("project", "name and website URL are required");
            return Err(AppError::validation(PROJECT_FIELDS_REQUIRED));
        }

        let project = NewProject {
            name: name.to_string(),
            website_url: website_url.to_string(),
        };
        if let Err(e) = self.gateway.create_project(&project).await {
            LogHelper::log_request_failure("create_project", &e);
            LogHelper::log_mutation("create_project", name, false);
            return Err(e.into());
        }
        LogHelper::log_mutation("create_project", name, true);
        self.refresh().await
    }

    /// `Ok(None)` when the project does not exist.
    #[instrument(skip(self))]
    pub async fn load_for_edit(&self, id: ProjectId) -> AppResult<Option<ProjectEditForm>> {
        let project = self.gateway.get_project(id).await.map_err(|e| {
            LogHelper::log_request_failure("get_project", &e);
            AppError::Request(e)
        })?;
        Ok(project.as_ref().map(ProjectEditForm::from_project))
    }

    /// An unchanged form succeeds without a request.
    #[instrument(skip(self, form), fields(project_id = form.id()))]
    pub async fn update(&self, form: &ProjectEditForm) -> AppResult<()> {
        let patch = form.to_patch();
        if patch.is_empty() {
            debug!("Nothing to update");
            return Ok(());
        }

        match self.gateway.update_project(form.id(), &patch).await {
            Ok(()) => {
                LogHelper::log_mutation("update_project", form.id(), true);
                Ok(())
            }
            Err(e) => {
                LogHelper::log_request_failure("update_project", &e);
                LogHelper::log_mutation("update_project", form.id(), false);
                Err(e.into())
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn delete(&mut self, id: ProjectId) -> AppResult<()> {
        if let Err(e) = self.gateway.delete_project(id).await {
            LogHelper::log_request_failure("delete_project", &e);
            LogHelper::log_mutation("delete_project", id, false);
            return Err(e.into());
        }
        self.projects.remove(id);
        LogHelper::log_mutation("delete_project", id, true);
        Ok(())
    }
}
