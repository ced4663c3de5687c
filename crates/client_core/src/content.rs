//! Static guidance shown alongside results. Hospital entries are mock data.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Precaution {
    pub title: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hospital {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
    pub distance_miles: f32,
}

pub const PRECAUTIONS: &[Precaution] = &[
    Precaution {
        title: "Stay Hydrated",
        description: "Drink plenty of water throughout the day (8-10 glasses). Dehydration can trigger sickle cell crises. Increase fluid intake during hot weather, illness, or physical activity.",
    },
    Precaution {
        title: "Avoid Temperature Extremes",
        description: "Extreme temperatures can trigger sickling. Dress warmly in cold weather and avoid overheating in hot weather. Use caution with swimming in very cold water and avoid excessive sun exposure.",
    },
    Precaution {
        title: "Manage Physical Activity",
        description: "Exercise is beneficial but avoid exhaustion. Take breaks during physical activity and stay hydrated. Avoid high-altitude activities without proper medical consultation.",
    },
    Precaution {
        title: "Prevent Infections",
        description: "Wash hands frequently and avoid people with contagious illnesses. Stay up-to-date with vaccinations, including annual flu shots. Seek prompt medical attention for fevers or signs of infection.",
    },
    Precaution {
        title: "Medication Adherence",
        description: "Take all prescribed medications as directed. Do not skip doses of hydroxyurea or other medications that help prevent complications. Carry pain medication as prescribed by your doctor.",
    },
    Precaution {
        title: "Healthy Diet",
        description: "Eat a balanced diet rich in fruits, vegetables, whole grains, and lean proteins. Consider folic acid supplements as recommended by your healthcare provider to support red blood cell production.",
    },
    Precaution {
        title: "Stress Management",
        description: "Practice stress-reduction techniques such as deep breathing, meditation, or yoga. Emotional stress can contribute to pain crises. Ensure adequate rest and sleep.",
    },
    Precaution {
        title: "Travel Precautions",
        description: "Consult your doctor before traveling. Carry medical documentation and medication. For air travel, drink extra fluids and move around periodically to prevent blood clots.",
    },
];

pub const MOCK_HOSPITALS: &[Hospital] = &[
    Hospital {
        name: "City General Hospital",
        lat: 40.7128,
        lng: -74.006,
        distance_miles: 1.2,
    },
    Hospital {
        name: "Sickle Cell Treatment Center",
        lat: 40.7148,
        lng: -74.013,
        distance_miles: 2.8,
    },
    Hospital {
        name: "University Medical Center",
        lat: 40.7158,
        lng: -73.998,
        distance_miles: 3.5,
    },
    Hospital {
        name: "Memorial Hospital",
        lat: 40.7118,
        lng: -74.016,
        distance_miles: 4.1,
    },
    Hospital {
        name: "Children's Medical Center",
        lat: 40.7138,
        lng: -74.026,
        distance_miles: 5.2,
    },
];

/// Mock hospitals ordered nearest first.
pub fn nearby_hospitals(limit: usize) -> Vec<Hospital> {
    let mut hospitals = MOCK_HOSPITALS.to_vec();
    hospitals.sort_by(|a, b| a.distance_miles.total_cmp(&b.distance_miles));
    hospitals.truncate(limit);
    hospitals
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hospitals_come_back_nearest_first() {
        let hospitals = nearby_hospitals(3);
        assert_eq!(hospitals.len(), 3);
        assert_eq!(hospitals[0].name, "City General Hospital");
        assert!(hospitals
            .windows(2)
            .all(|pair| pair[0].distance_miles <= pair[1].distance_miles));
        assert_eq!(nearby_hospitals(50).len(), MOCK_HOSPITALS.len());
    }

    #[test]
    fn every_precaution_has_text() {
        assert_eq!(PRECAUTIONS.len(), 8);
        assert!(PRECAUTIONS
            .iter()
            .all(|p| !p.title.is_empty() && !p.description.is_empty()));
    }
}
