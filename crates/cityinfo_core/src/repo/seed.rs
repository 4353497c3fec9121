//! Static city fixture shared by the memory store and tests.
//!
//! Mirrors `db/migrations/0002_seed_cities.sql` id for id so both backends
//! start from the same state.

use crate::model::city::{City, PointOfInterest};

/// Returns the seeded cities with their points of interest, in id order.
pub fn seed_cities() -> Vec<City> {
    vec![
        city(
            1,
            "New York City",
            "The one with that big park.",
            &[
                (1, "Central Park", "The most visited urban park in the United States."),
                (
                    2,
                    "Empire State Building",
                    "A 102-story skyscraper located in Midtown Manhattan.",
                ),
            ],
        ),
        city(
            2,
            "Antwerp",
            "The one with the cathedral that was never really finished.",
            &[
                (
                    3,
                    "Cathedral of Our Lady",
                    "A Gothic style cathedral, conceived by architects Jan and Pieter Appelmans.",
                ),
                (
                    4,
                    "Antwerp Central Station",
                    "The finest example of railway architecture in Belgium.",
                ),
            ],
        ),
        city(
            3,
            "Paris",
            "The one with that big tower.",
            &[
                (5, "Eiffel Tower", "A wrought iron lattice tower on the Champ de Mars."),
                (6, "The Louvre", "The world's largest museum."),
            ],
        ),
    ]
}

fn city(id: i64, name: &str, description: &str, points: &[(i64, &str, &str)]) -> City {
    let mut city = City::new(id, name, Some(description));
    city.points_of_interest = points
        .iter()
        .map(|(poi_id, poi_name, poi_description)| PointOfInterest {
            id: *poi_id,
            name: (*poi_name).to_string(),
            description: Some((*poi_description).to_string()),
        })
        .collect();
    city
}
