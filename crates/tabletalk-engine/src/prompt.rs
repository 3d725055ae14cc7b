//! Prompt construction for the two LLM steps.

use crate::CandidateSchema;
use tabletalk_store::QueryResult;

/// System prompt for the SQL-generation step.
pub const SQL_SYSTEM_PROMPT: &str = r#"You are an expert SQL analyst. Given a question and the schema of the tables available to you, write one SQL query that answers the question.

Rules:
1. Use ONLY the tables listed in the schema. Never reference any other table.
2. Use only columns that appear in the schema.
3. Standard SQL is available: joins, aggregates, GROUP BY, ORDER BY, LIMIT.
4. Qualify column names with the table name or an alias when more than one table is involved.
5. Return ONLY the SQL statement - no markdown fences, no explanations, no commentary."#;

/// System prompt for the answer-synthesis step.
pub const ANSWER_SYSTEM_PROMPT: &str = r#"You turn SQL query results into short natural-language answers. Given the original question, the SQL that was executed and the rows it returned, answer the question in one or two sentences.

Rules:
1. Base the answer ONLY on the rows provided. Do not use outside knowledge.
2. If the result set is empty, say that no matching data was found.
3. Do not mention SQL, tables or queries in the answer; just answer the question."#;

/// User prompt for the SQL-generation step: candidate schemas plus the question.
pub fn sql_generation_prompt(question: &str, candidates: &[CandidateSchema]) -> String {
    format!(
        "## Schema\n\n{}\n## Question\n\n{}",
        render_schemas(candidates),
        question
    )
}

/// User prompt for the answer-synthesis step: question, executed SQL and raw rows.
pub fn answer_synthesis_prompt(question: &str, sql: &str, rows: &QueryResult) -> String {
    format!(
        "## Question\n\n{}\n\n## SQL executed\n\n{}\n\n## Result rows\n\n{}",
        question,
        sql,
        rows.to_json()
    )
}

/// Render each candidate table as name, optional description and column list.
pub fn render_schemas(candidates: &[CandidateSchema]) -> String {
    let mut out = String::new();
    for schema in candidates {
        out.push_str(&format!("Table: {}\n", schema.name));
        if let Some(context) = &schema.context {
            out.push_str(&format!("Description: {}\n", context));
        }
        let columns: Vec<String> = schema
            .columns
            .iter()
            .map(|col| format!("{} ({})", col.name, col.data_type))
            .collect();
        out.push_str(&format!("Columns: {}\n\n", columns.join(", ")));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabletalk_store::ColumnInfo;

    fn appearances() -> CandidateSchema {
        CandidateSchema {
            name: "appearances".to_string(),
            context: Some("One row per player per game.".to_string()),
            columns: vec![
                ColumnInfo {
                    name: "player_id".to_string(),
                    data_type: "VARCHAR".to_string(),
                    is_nullable: true,
                },
                ColumnInfo {
                    name: "yellow_cards".to_string(),
                    data_type: "BIGINT".to_string(),
                    is_nullable: true,
                },
            ],
        }
    }

    #[test]
    fn schema_rendering_lists_name_context_and_columns() {
        let rendered = render_schemas(&[appearances()]);
        assert!(rendered.contains("Table: appearances"));
        assert!(rendered.contains("Description: One row per player per game."));
        assert!(rendered.contains("player_id (VARCHAR)"));
        assert!(rendered.contains("yellow_cards (BIGINT)"));
    }

    #[test]
    fn generation_prompt_contains_only_candidate_tables() {
        let prompt = sql_generation_prompt("How many yellow cards?", &[appearances()]);
        assert!(prompt.contains("appearances"));
        assert!(prompt.contains("How many yellow cards?"));
        assert!(!prompt.contains("players"));
    }

    #[test]
    fn synthesis_prompt_carries_sql_and_rows() {
        let rows = QueryResult {
            columns: vec!["total".to_string()],
            rows: vec![vec![serde_json::json!(21)]],
            row_count: 1,
        };
        let prompt = answer_synthesis_prompt(
            "How many yellow cards?",
            "SELECT SUM(yellow_cards) AS total FROM appearances",
            &rows,
        );
        assert!(prompt.contains("SELECT SUM(yellow_cards)"));
        assert!(prompt.contains("\"total\":21"));
    }
}
