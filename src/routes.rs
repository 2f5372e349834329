use axum::{
    Router,
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::get,
};
use std::sync::Arc;

use crate::config::CrudAction;
use crate::controller::{ActionContext, ActionOutcome, CrudController};
use crate::request::RequestContext;

/// Run `action` for one request and turn the outcome into a response.
///
/// This is the whole request lifecycle: a fresh [`ActionContext`] is created,
/// the action runs, and the controller's responder hooks build the response.
pub async fn handle_action<C: CrudController>(
    controller: &C,
    action: CrudAction,
    request: &RequestContext,
) -> Response {
    let mut context = ActionContext::new(controller, request);
    match context.run(action).await {
        Ok(ActionOutcome::Render { view }) => controller
            .render(&view, &mut context)
            .await
            .unwrap_or_else(IntoResponse::into_response),
        Ok(ActionOutcome::Redirect { location, flash }) => {
            let mut response = controller.redirect(&location);
            if let Some(flash) = flash {
                controller.set_flash(&flash, &mut response);
            }
            response
        }
        Ok(ActionOutcome::Validation(errors)) => controller.validation_response(&errors),
        Err(err) => err.into_response(),
    }
}

async fn default_action_handler<C: CrudController>(
    State(controller): State<Arc<C>>,
    request: RequestContext,
) -> Response {
    let action = controller.config().default_action;
    handle_action(controller.as_ref(), action, &request).await
}

async fn action_handler<C: CrudController>(
    State(controller): State<Arc<C>>,
    Path(action): Path<String>,
    request: RequestContext,
) -> Response {
    match action.parse::<CrudAction>() {
        Ok(action) => handle_action(controller.as_ref(), action, &request).await,
        Err(err) => err.into_response(),
    }
}

/// Router serving a controller: `/` runs the default action, `/{action}` any
/// of `list`, `edit`, `view` and `delete`, for GET and POST alike.
///
/// Nest it under the base path the controller's URL builder uses:
///
/// ```rust,ignore
/// let app = Router::new().nest("/posts", crud_router(Arc::new(controller)));
/// ```
pub fn crud_router<C: CrudController>(controller: Arc<C>) -> Router {
    Router::new()
        .route(
            "/",
            get(default_action_handler::<C>).post(default_action_handler::<C>),
        )
        .route(
            "/{action}",
            get(action_handler::<C>).post(action_handler::<C>),
        )
        .with_state(controller)
}
