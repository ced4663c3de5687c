use client_core::{
    content::{Hospital, Precaution},
    results::ResultsView,
    wizard::WizardSession,
};

pub fn print_review(session: &WizardSession) {
    let patient = session.patient();
    println!("Review");
    println!("  Name:     {}", patient.full_name.trim());
    println!("  Age:      {}", patient.age.trim());
    println!(
        "  Gender:   {}",
        patient.gender.map(|g| g.as_str()).unwrap_or("-")
    );
    println!("  Phone:    {}", patient.phone.trim());
    println!("  Location: {}", patient.location().unwrap_or("N/A"));
    println!("  Images:   {}", session.uploads().len());
    for name in session.uploads().filenames() {
        println!("    - {name}");
    }
}

pub fn print_results(view: &ResultsView) {
    if view.is_empty() {
        println!("No images have been analysed yet. Run `sicklescan detect` first.");
        return;
    }

    println!("{}", view.headline());
    println!("{}", view.advisory());
    println!();
    if let Some(patient) = &view.patient {
        println!("Patient:  {} ({}, {})", patient.name, patient.age, patient.gender);
        println!("Location: {}", patient.location);
        println!();
    }

    let summary = &view.summary;
    println!("Images analysed:   {}", summary.total);
    println!("Sickle cells:      {}", summary.detected);
    println!("Normal:            {}", summary.normal);
    println!(
        "Confidence:        {}% (placeholder, not model output)",
        summary.placeholder_confidence_percent
    );
    println!();
    for row in &view.images {
        println!("  {:<32} {}", row.name, row.label);
    }
    println!();
    println!("{}", view.interpretation());
}

pub fn print_precautions(precautions: &[Precaution]) {
    for (n, precaution) in precautions.iter().enumerate() {
        println!("{}. {}", n + 1, precaution.title);
        println!("   {}", precaution.description);
    }
}

pub fn print_hospitals(hospitals: &[Hospital]) {
    println!("Nearby hospitals (sample data)");
    for hospital in hospitals {
        println!(
            "  {:<32} {:>4.1} mi  ({:.4}, {:.4})",
            hospital.name, hospital.distance_miles, hospital.lat, hospital.lng
        );
    }
}
