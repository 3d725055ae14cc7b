//! Static metadata for the player-transfer-market CSV dataset, plus the demo
//! questions run when none are given on the command line.

use tabletalk_catalog::TableDescriptor;

/// Descriptors for every table the bulk loader materializes. Context strings
/// steer the retriever; tables whose names speak for themselves go without.
pub fn descriptors() -> Vec<TableDescriptor> {
    vec![
        TableDescriptor::with_context(
            "appearances",
            "Each row is one appearance of a soccer player in one game, i.e. one row per \
             player per game played. Columns include goals, assists, yellow_cards and \
             red_cards for that game (a player can collect several yellow and red cards \
             per game), plus ids referencing other tables such as player_id and game_id.",
        ),
        TableDescriptor::new("club_games"),
        TableDescriptor::with_context("clubs", "All clubs in leagues. One row per club."),
        TableDescriptor::new("competitions"),
        TableDescriptor::with_context(
            "game_events",
            "One row per in-game event. The type column holds one of four values: Cards, \
             Goals, Shootout, Substitutions.",
        ),
        TableDescriptor::new("game_lineups"),
        TableDescriptor::new("games"),
        TableDescriptor::with_context(
            "player_valuations",
            "Market valuations of players over various dates. The market_value_in_eur \
             column is the valuation in Euros.",
        ),
        TableDescriptor::new("players"),
        TableDescriptor::new("transfers"),
    ]
}

pub fn demo_questions() -> Vec<String> {
    [
        "How many total yellow cards have been given out?",
        "What player had the most number of total yellow cards?",
        "What country is Sergio Ramos from?",
        "What is the most recent valuation in Euros of Sergio Ramos?",
        "What club had the most number of substitutions in a single game and how many substitutions were there?",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_names_are_unique() {
        let mut names: Vec<String> = descriptors().into_iter().map(|d| d.name).collect();
        let before = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), before);
    }

    #[test]
    fn demo_questions_are_nonempty() {
        assert!(!demo_questions().is_empty());
    }
}
