use vellum::colors::MaybeColorize;

pub fn compiled(something: impl ToString) {
    eprintln!("{} {}", "compiled".green(), something.to_string());
}

pub fn skipped(something: impl ToString) {
    eprintln!("{} {}", "skipped".yellow(), something.to_string());
}

pub fn removed(something: impl ToString) {
    eprintln!("{} {}", "removed".red(), something.to_string());
}

pub fn watching(something: impl ToString) {
    eprintln!("{} {}", "watching".purple(), something.to_string());
}

pub fn error(something: impl ToString) {
    eprintln!("{}: {}", "error".red(), something.to_string());
}
