use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerInfo},
    tool, tool_handler, tool_router,
    schemars::JsonSchema,
    ErrorData as McpError, ServerHandler, ServiceExt,
};
use serde::Deserialize;

use keepgoing_core::models::{CreateHabitInput, UpdateHabitInput};
use keepgoing_core::week;
use keepgoing_core::{Database, Error};

#[derive(Clone)]
pub struct McpServer {
    db: Database,
    tool_router: ToolRouter<Self>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddHabitRequest {
    #[schemars(description = "Name of the habit to start tracking")]
    pub name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SetDayRequest {
    #[schemars(description = "The habit id")]
    pub habit_id: i64,
    #[schemars(description = "Day of the current week: 0-6 or sun..sat")]
    pub day: String,
    #[schemars(description = "Whether the habit was done that day")]
    pub done: bool,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DeleteHabitRequest {
    #[schemars(description = "The habit id to stop tracking")]
    pub habit_id: i64,
}

impl McpServer {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            tool_router: Self::tool_router(),
        }
    }

    fn store_error(err: Error) -> McpError {
        match err {
            Error::Validation(_) | Error::NotFound(_) | Error::BadSnapshot(_) => {
                McpError::invalid_params(err.to_string(), None)
            }
            _ => McpError::internal_error(err.to_string(), None),
        }
    }
}

#[tool_router]
impl McpServer {
    #[tool(description = "List all habits with their week vectors and streaks")]
    async fn list_habits(&self) -> Result<CallToolResult, McpError> {
        let habits = self.db.all_habits().map_err(Self::store_error)?;

        let json = serde_json::to_string_pretty(&habits)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;

        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(description = "Start tracking a new habit")]
    async fn add_habit(
        &self,
        params: Parameters<AddHabitRequest>,
    ) -> Result<CallToolResult, McpError> {
        let habit = self
            .db
            .create_habit(&CreateHabitInput {
                name: params.0.name,
            })
            .map_err(Self::store_error)?;

        Ok(CallToolResult::success(vec![Content::text(format!(
            "Tracking \"{}\" with id {}",
            habit.name, habit.id
        ))]))
    }

    #[tool(description = "Mark one day of the current week as done or not done")]
    async fn set_day(
        &self,
        params: Parameters<SetDayRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        let day = week::parse_day(&req.day)
            .ok_or_else(|| McpError::invalid_params(format!("Unknown day: {}", req.day), None))?;

        let habit = self
            .db
            .get_habit(req.habit_id)
            .map_err(Self::store_error)?
            .ok_or_else(|| McpError::invalid_params("Habit not found", None))?;

        let mut days = habit.days_checked;
        days[day] = req.done;

        let updated = self
            .db
            .update_habit(
                req.habit_id,
                &UpdateHabitInput {
                    days_checked: days.to_vec(),
                    name: None,
                },
            )
            .map_err(Self::store_error)?;

        let json = serde_json::to_string_pretty(&updated)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;

        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(description = "Stop tracking a habit")]
    async fn delete_habit(
        &self,
        params: Parameters<DeleteHabitRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.db
            .delete_habit(params.0.habit_id)
            .map_err(Self::store_error)?;

        Ok(CallToolResult::success(vec![Content::text(
            "Habit deleted",
        )]))
    }
}

#[tool_handler]
impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some("keepgoing MCP server for weekly habit tracking".into()),
            ..Default::default()
        }
    }
}

pub async fn run_stdio_server(db: Database) -> anyhow::Result<()> {
    use tokio::io::{stdin, stdout};

    tracing::info!("Starting MCP server via stdio");

    let service = McpServer::new(db);
    let server = service.serve((stdin(), stdout())).await?;

    let quit_reason = server.waiting().await?;
    tracing::info!("MCP server stopped: {:?}", quit_reason);

    Ok(())
}
