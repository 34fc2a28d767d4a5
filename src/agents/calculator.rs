//! CalculatorAgent: arithmetic and single-variable linear equations.

use crate::a2a::agent_card::{AgentCard, Skill};
use crate::a2a::handler::AgentHandler;
use crate::a2a::orchestrator::CALCULATOR_AGENT;
use crate::a2a::types::TaskMessage;
use crate::agents::arith::{self, CalcError};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

static EXPRESSION_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\d\s+\-*/().]+$").expect("expression charset regex"));

const VARIABLES: [char; 3] = ['x', 'y', 'z'];

const INVALID_EXPRESSION: &str =
    "Invalid expression. Please use only numbers and operators (+, -, *, /, parentheses).";

pub struct CalculatorAgent {
    url: String,
}

impl CalculatorAgent {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Evaluate a request in the calculator's small language.
    pub fn answer(&self, content: &str) -> anyhow::Result<String> {
        let content = content.trim().to_lowercase();

        if content.contains('=') {
            if let Some(var) = VARIABLES.iter().copied().find(|v| content.contains(*v)) {
                return solve(&content, var);
            }
        }
        calculate(&content)
    }
}

fn calculate(content: &str) -> anyhow::Result<String> {
    let expression = content.replace("calculate", "").replace("what is", "");
    let expression = expression.trim();

    if !EXPRESSION_CHARS.is_match(expression) {
        anyhow::bail!(INVALID_EXPRESSION);
    }

    let value = arith::evaluate(expression).map_err(|e| match e {
        CalcError::DivisionByZero => anyhow::anyhow!("Cannot divide by zero"),
        other => anyhow::anyhow!("Could not evaluate '{}': {}", expression, other),
    })?;
    Ok(format!(
        "The result of {} is {}",
        expression,
        arith::format_number(value)
    ))
}

fn solve(content: &str, var: char) -> anyhow::Result<String> {
    let equation = content.replace("solve", "").replace("equation", "");
    let equation = equation.trim().trim_start_matches(':').trim();

    let solution = arith::solve_linear(equation, var)
        .map_err(|e| anyhow::anyhow!("Could not solve '{}': {}", equation, e))?;
    Ok(format!(
        "The solution is {} = {}",
        var,
        arith::format_number(solution)
    ))
}

#[async_trait]
impl AgentHandler for CalculatorAgent {
    fn card(&self) -> AgentCard {
        AgentCard::new(
            CALCULATOR_AGENT,
            "An agent that performs basic mathematical calculations",
            self.url.clone(),
            vec![
                Skill::text("calculate", "Perform basic arithmetic operations").with_parameter(
                    "expression",
                    json!({
                        "type": "string",
                        "description": "Mathematical expression to evaluate"
                    }),
                ),
                Skill::text("solve_equation", "Solve simple linear equations").with_parameter(
                    "equation",
                    json!({
                        "type": "string",
                        "description": "Linear equation to solve (e.g., '2x + 5 = 15')"
                    }),
                ),
            ],
        )
        .with_metadata("version", json!("1.0.0"))
        .with_metadata("type", json!("calculator"))
    }

    async fn handle(&self, task_id: &str, message: &TaskMessage) -> anyhow::Result<String> {
        tracing::debug!("CalculatorAgent: task {} asks {:?}", task_id, message.content);
        self.answer(&message.content)
    }
}
