use std::path::Path;

use crate::{
    domain::ids::StudentId,
    infra::{self, config::FileConfigAdapter, contracts::ConfigAdapter, error::AppError},
    usecases::context::AppContext,
};

pub fn bootstrap(
    config_path: Option<&Path>,
    user_override: Option<StudentId>,
) -> Result<AppContext, AppError> {
    let context = build_context(&FileConfigAdapter::new(config_path), user_override)?;
    infra::logging::init(&context.config.logging)?;

    Ok(context)
}

fn build_context(
    adapter: &dyn ConfigAdapter,
    user_override: Option<StudentId>,
) -> Result<AppContext, AppError> {
    let mut config = adapter.load()?;
    if user_override.is_some() {
        config.session.user_id = user_override;
    }

    let current_user = config.session.user_id.ok_or(AppError::MissingUserId)?;
    Ok(AppContext::new(config, current_user))
}
