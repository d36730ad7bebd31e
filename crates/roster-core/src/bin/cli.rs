use bar_roster::day::ParseDayError;
use bar_roster::{
    Bar, DAYS, DayOfWeek, GeminiGenerator, KeyValueStore, OperatingHours, RosterConfig,
    RosterError, Session, SessionError, Tag, UserProfile, Worker, export_file_name, format_hour,
    save_schedule_to_csv, telemetry,
};
use std::io::{self, Write};

type Store = Box<dyn KeyValueStore + Send + Sync>;

fn push_row<'a>(out: &mut String, widths: &[usize], cells: impl IntoIterator<Item = &'a str>) {
    let mut cells = cells.into_iter();
    out.push('|');
    for w in widths {
        let cell = cells.next().unwrap_or("");
        out.push(' ');
        out.push_str(cell);
        let pad = w.saturating_sub(cell.chars().count());
        if pad > 0 {
            out.push_str(&" ".repeat(pad));
        }
        out.push(' ');
        out.push('|');
    }
    out.push('\n');
}

fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (ci, cell) in row.iter().enumerate() {
            if ci < widths.len() && cell.chars().count() > widths[ci] {
                widths[ci] = cell.chars().count();
            }
        }
    }

    let mut sep = String::new();
    sep.push('+');
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    push_row(&mut out, &widths, headers.iter().copied());
    out.push_str(&sep);
    out.push('\n');
    for row in rows {
        push_row(&mut out, &widths, row.iter().map(String::as_str));
    }
    out.push_str(&sep);
    out.push('\n');
    out
}

fn print_help() {
    println!(
        "Commands:\n  help                                  Show this help\n  register <username> <email> <phone> [+code]\n                                        Create an account and log in\n  login <username>                      Log in\n  logout                                Log out\n  whoami                                Show the logged-in user\n  profile <username> <email> <phone> [+code]\n                                        Update the profile\n  bars                                  List your bars\n  bar add <name> | <address> | <city>   Create a bar\n  bar select <name|id>                  Manage a bar\n  bar back                              Return to the bar list\n  bar delete <name|id>                  Delete a bar\n  bar hours <day> <open> <close>        Set a day's operating hours\n  staff list                            List workers\n  staff add <name...>                   Add a worker with default availability\n  staff remove <name...>                Remove a worker\n  staff avail <start> <end> <name...>   Set possible working hours\n  staff pref <start> <end> <days> <name...>\n                                        Set preferred hours and days per week\n  staff off <day> <name...>             Toggle an unavailable day\n  staff tag <tag> <name...>             Assign a tag\n  staff untag <tag> <name...>           Remove a tag\n  tags list                             List tags\n  tags add <name> [#color]              Create a tag\n  tags remove <name>                    Delete a tag\n  req show                              Show the staffing grid\n  req set <day> <hour> <count>          Set headcount for a slot\n  req inc|dec <day> <hour>              Adjust headcount for a slot\n  req row <hour>                        Add one to that hour on every open day\n  req col <day>                         Add one to every open hour of a day\n  req must <day> <hour> <names,...>     Set mandatory workers for a slot\n  schedule show                         Show the roster\n  schedule generate                     Ask the model for a roster\n  schedule coverage                     List understaffed slots\n  schedule export [path]                Save the roster as CSV\n  schedule clear                        Drop the roster\n  quit|exit                             Exit"
    );
}

fn rest(parts: &[&str], from: usize) -> String {
    parts.get(from..).map(|p| p.join(" ")).unwrap_or_default()
}

fn parse_day(s: Option<&&str>) -> Result<DayOfWeek, String> {
    match s {
        Some(s) => s.parse().map_err(|e: ParseDayError| e.to_string()),
        None => Err("missing day".to_string()),
    }
}

fn parse_hour(s: Option<&&str>) -> Result<u8, String> {
    match s.and_then(|s| s.parse::<u8>().ok()) {
        Some(h) if h <= 23 => Ok(h),
        _ => Err("hour must be a number 0-23".to_string()),
    }
}

fn profile_from(parts: &[&str]) -> Option<UserProfile> {
    match (parts.get(1), parts.get(2), parts.get(3)) {
        (Some(username), Some(email), Some(phone)) => {
            let mut profile = UserProfile::new(*username, *email, *phone);
            profile.country_code = parts.get(4).map(|c| c.to_string());
            Some(profile)
        }
        _ => None,
    }
}

fn resolve_bar(session: &Session<Store>, key: &str) -> Option<String> {
    session
        .bars()
        .iter()
        .find(|b| b.id == key || b.name.eq_ignore_ascii_case(key.trim()))
        .map(|b| b.id.clone())
}

fn worker_id(bar: &Bar, key: &str) -> Result<String, RosterError> {
    bar.worker(key)
        .or_else(|| bar.find_worker_by_name(key))
        .map(|w| w.id.clone())
        .ok_or_else(|| RosterError::WorkerNotFound(key.to_string()))
}

fn tag_id(bar: &Bar, key: &str) -> Result<String, RosterError> {
    bar.tag(key)
        .or_else(|| bar.find_tag_by_name(key))
        .map(|t| t.id.clone())
        .ok_or_else(|| RosterError::TagNotFound(key.to_string()))
}

fn print_bars(session: &Session<Store>) {
    let rows: Vec<Vec<String>> = session
        .bars()
        .iter()
        .map(|b| {
            vec![
                b.name.clone(),
                b.address.clone(),
                b.city.clone(),
                b.workers.len().to_string(),
                if b.schedule.is_empty() {
                    "no".to_string()
                } else {
                    "yes".to_string()
                },
            ]
        })
        .collect();
    println!(
        "{}",
        render_table(&["Name", "Address", "City", "Staff", "Roster"], &rows)
    );
}

fn print_staff(bar: &Bar) {
    let rows: Vec<Vec<String>> = bar
        .workers
        .iter()
        .map(|w| {
            let tags = w
                .tag_ids
                .iter()
                .filter_map(|id| bar.tag(id))
                .map(|t| t.name.as_str())
                .collect::<Vec<_>>()
                .join(",");
            let off = w
                .unavailable_days
                .iter()
                .map(|d| d.short())
                .collect::<Vec<_>>()
                .join(",");
            vec![
                w.name.clone(),
                format!("{}-{}", format_hour(w.possible_start), format_hour(w.possible_end)),
                format!(
                    "{}-{}",
                    format_hour(w.preferred_start),
                    format_hour(w.preferred_end)
                ),
                w.preferred_days_count.to_string(),
                off,
                tags,
                bar.hours_for_worker(&w.id).to_string(),
            ]
        })
        .collect();
    println!(
        "{}",
        render_table(
            &["Name", "Available", "Preferred", "Days", "Off", "Tags", "Hours"],
            &rows
        )
    );
}

fn print_tags(bar: &Bar) {
    let rows: Vec<Vec<String>> = bar
        .tags
        .iter()
        .map(|t| {
            let holders = bar.workers.iter().filter(|w| w.has_tag(&t.id)).count();
            vec![t.name.clone(), t.color.clone(), holders.to_string()]
        })
        .collect();
    println!("{}", render_table(&["Tag", "Color", "Workers"], &rows));
}

/// Hours open on at least one day, as grid rows.
fn grid_hours(bar: &Bar) -> Vec<u8> {
    (0..24u8)
        .filter(|h| DAYS.iter().any(|d| bar.operating_hours.is_open(*d, *h)))
        .collect()
}

fn grid_headers() -> Vec<&'static str> {
    let mut headers = vec!["Hour"];
    headers.extend(DAYS.iter().map(|d| d.short()));
    headers
}

fn print_requirements(bar: &Bar) {
    let rows: Vec<Vec<String>> = grid_hours(bar)
        .into_iter()
        .map(|hour| {
            let mut row = vec![format_hour(hour)];
            for day in DAYS {
                if !bar.operating_hours.is_open(day, hour) {
                    row.push("-".to_string());
                    continue;
                }
                let cell = match bar.find_requirement(day, hour) {
                    Some(r) if !r.mandatory_worker_ids.is_empty() => format!("{}*", r.needed_count),
                    Some(r) => r.needed_count.to_string(),
                    None => "0".to_string(),
                };
                row.push(cell);
            }
            row
        })
        .collect();
    println!("{}", render_table(&grid_headers(), &rows));
}

fn print_schedule(bar: &Bar) {
    if bar.schedule.is_empty() {
        println!("No roster yet. Run 'schedule generate'.");
        return;
    }
    let rows: Vec<Vec<String>> = grid_hours(bar)
        .into_iter()
        .map(|hour| {
            let mut row = vec![format_hour(hour)];
            for day in DAYS {
                if !bar.operating_hours.is_open(day, hour) {
                    row.push("-".to_string());
                    continue;
                }
                let names = bar
                    .staff_for_slot(day, hour)
                    .iter()
                    .map(|w| w.name.as_str())
                    .collect::<Vec<_>>()
                    .join(",");
                row.push(names);
            }
            row
        })
        .collect();
    println!("{}", render_table(&grid_headers(), &rows));
}

fn print_coverage(bar: &Bar) {
    let gaps = bar.understaffed_slots();
    if gaps.is_empty() {
        println!("Every slot is fully staffed.");
        return;
    }
    let rows: Vec<Vec<String>> = gaps
        .iter()
        .map(|s| {
            vec![
                s.day.to_string(),
                format_hour(s.hour),
                s.needed.to_string(),
                s.assigned.to_string(),
                s.missing.to_string(),
            ]
        })
        .collect();
    println!(
        "{}",
        render_table(&["Day", "Hour", "Needed", "Assigned", "Missing"], &rows)
    );
}

fn report<T>(result: Result<T, SessionError>, done: impl FnOnce(T)) {
    match result {
        Ok(value) => done(value),
        Err(e) => println!("Error: {}", e),
    }
}

fn handle_bar(session: &mut Session<Store>, parts: &[&str]) {
    match parts.get(1).copied() {
        Some("add") => {
            let body = rest(parts, 2);
            let fields: Vec<&str> = body.split('|').map(str::trim).collect();
            if fields.len() != 3 {
                println!("Usage: bar add <name> | <address> | <city>");
                return;
            }
            let bar = match Bar::new(fields[0], fields[1], fields[2]) {
                Ok(bar) => bar,
                Err(e) => {
                    println!("Error: {}", e);
                    return;
                }
            };
            report(session.add_bar(bar), |id| {
                println!("Bar created ({id}).");
            });
        }
        Some("select") => match resolve_bar(session, &rest(parts, 2)) {
            Some(id) => report(session.select_bar(&id), |bar| {
                println!("Managing {} ({}, {}).", bar.name, bar.address, bar.city);
            }),
            None => println!("Bar not found."),
        },
        Some("back") => {
            session.deselect_bar();
            print_bars(session);
        }
        Some("delete") => match resolve_bar(session, &rest(parts, 2)) {
            Some(id) => report(session.delete_bar(&id), |bar| {
                println!("Deleted {}.", bar.name);
            }),
            None => println!("Bar not found."),
        },
        Some("hours") => {
            let day = match parse_day(parts.get(2)) {
                Ok(d) => d,
                Err(e) => {
                    println!("{}", e);
                    return;
                }
            };
            match (parse_hour(parts.get(3)), parse_hour(parts.get(4))) {
                (Ok(open), Ok(close)) => report(
                    session.update_current_bar(|bar| {
                        bar.set_operating_hours(day, OperatingHours::new(open, close))
                    }),
                    |_| println!("{day}: {} to {}", format_hour(open), format_hour(close)),
                ),
                _ => println!("Usage: bar hours <day> <open> <close>"),
            }
        }
        _ => println!("Usage: bar add|select|back|delete|hours ..."),
    }
}

fn handle_staff(session: &mut Session<Store>, parts: &[&str]) {
    match parts.get(1).copied() {
        Some("list") | None => report(session.current_bar(), print_staff),
        Some("add") => {
            let name = rest(parts, 2);
            report(
                session.update_current_bar(|bar| bar.add_worker(Worker::new(name)).map(|w| w.name.clone())),
                |name| println!("Added {name}."),
            );
        }
        Some("remove") => {
            let key = rest(parts, 2);
            report(
                session.update_current_bar(|bar| {
                    let id = worker_id(bar, &key)?;
                    bar.remove_worker(&id)
                }),
                |w| println!("Removed {}.", w.name),
            );
        }
        Some("avail") | Some("pref") => {
            let is_pref = parts[1] == "pref";
            let (start, end) = match (parse_hour(parts.get(2)), parse_hour(parts.get(3))) {
                (Ok(s), Ok(e)) => (s, e),
                _ => {
                    println!("Usage: staff {} <start> <end> ...", parts[1]);
                    return;
                }
            };
            let days = if is_pref {
                match parts.get(4).and_then(|d| d.parse::<u8>().ok()) {
                    Some(d) => Some(d),
                    None => {
                        println!("Usage: staff pref <start> <end> <days> <name...>");
                        return;
                    }
                }
            } else {
                None
            };
            let key = rest(parts, if is_pref { 5 } else { 4 });
            report(
                session.update_current_bar(|bar| {
                    let id = worker_id(bar, &key)?;
                    let mut worker = bar
                        .worker(&id)
                        .cloned()
                        .ok_or_else(|| RosterError::WorkerNotFound(id.clone()))?;
                    worker = match days {
                        Some(days) => worker.with_preference(start, end, days),
                        None => worker.with_availability(start, end),
                    };
                    bar.update_worker(worker)
                }),
                |_| println!("Updated {key}."),
            );
        }
        Some("off") => {
            let day = match parse_day(parts.get(2)) {
                Ok(d) => d,
                Err(e) => {
                    println!("{}", e);
                    return;
                }
            };
            let key = rest(parts, 3);
            report(
                session.update_current_bar(|bar| {
                    let id = worker_id(bar, &key)?;
                    let mut worker = bar
                        .worker(&id)
                        .cloned()
                        .ok_or_else(|| RosterError::WorkerNotFound(id.clone()))?;
                    let now_off = if worker.unavailable_days.contains(&day) {
                        worker.unavailable_days.retain(|d| *d != day);
                        false
                    } else {
                        worker.unavailable_days.push(day);
                        worker.preferred_days.retain(|d| *d != day);
                        true
                    };
                    bar.update_worker(worker)?;
                    Ok(now_off)
                }),
                |off| {
                    if off {
                        println!("{key} is off on {day}.");
                    } else {
                        println!("{key} is available on {day}.");
                    }
                },
            );
        }
        Some("tag") | Some("untag") => {
            let assign = parts[1] == "tag";
            let Some(tag_key) = parts.get(2).copied() else {
                println!("Usage: staff {} <tag> <name...>", parts[1]);
                return;
            };
            let key = rest(parts, 3);
            report(
                session.update_current_bar(|bar| {
                    let wid = worker_id(bar, &key)?;
                    let tid = tag_id(bar, tag_key)?;
                    if assign {
                        bar.assign_tag(&wid, &tid)
                    } else {
                        bar.unassign_tag(&wid, &tid)
                    }
                }),
                |_| println!("Tags updated for {key}."),
            );
        }
        _ => println!("Usage: staff list|add|remove|avail|pref|off|tag|untag ..."),
    }
}

fn handle_tags(session: &mut Session<Store>, parts: &[&str]) {
    match parts.get(1).copied() {
        Some("list") | None => report(session.current_bar(), print_tags),
        Some("add") => {
            let Some(name) = parts.get(2) else {
                println!("Usage: tags add <name> [#color]");
                return;
            };
            let mut tag = Tag::new(*name);
            if let Some(color) = parts.get(3) {
                tag = tag.with_color(*color);
            }
            report(
                session.update_current_bar(|bar| bar.add_tag(tag).map(|t| t.name.clone())),
                |name| println!("Tag {name} created."),
            );
        }
        Some("remove") => {
            let key = rest(parts, 2);
            report(
                session.update_current_bar(|bar| {
                    let id = tag_id(bar, &key)?;
                    bar.remove_tag(&id)
                }),
                |t| println!("Tag {} removed.", t.name),
            );
        }
        _ => println!("Usage: tags list|add|remove ..."),
    }
}

fn handle_req(session: &mut Session<Store>, parts: &[&str]) {
    match parts.get(1).copied() {
        Some("show") | None => report(session.current_bar(), print_requirements),
        Some(op @ ("set" | "inc" | "dec")) => {
            let (day, hour) = match (parse_day(parts.get(2)), parse_hour(parts.get(3))) {
                (Ok(d), Ok(h)) => (d, h),
                (Err(e), _) | (_, Err(e)) => {
                    println!("{}", e);
                    return;
                }
            };
            let count = if op == "set" {
                match parts.get(4).and_then(|c| c.parse::<u32>().ok()) {
                    Some(c) => Some(c),
                    None => {
                        println!("Usage: req set <day> <hour> <count>");
                        return;
                    }
                }
            } else {
                None
            };
            report(
                session.update_current_bar(|bar| match (op, count) {
                    ("set", Some(c)) => bar.set_requirement(day, hour, c),
                    ("inc", _) => bar.increment_requirement(day, hour),
                    _ => bar.decrement_requirement(day, hour),
                }),
                |stored| println!("{day} {}: {stored} needed", format_hour(hour)),
            );
        }
        Some("row") => match parse_hour(parts.get(2)) {
            Ok(hour) => report(session.update_current_bar(|bar| bar.increment_hour(hour)), |_| {
                println!("Raised {} on every open day.", format_hour(hour))
            }),
            Err(e) => println!("{}", e),
        },
        Some("col") => match parse_day(parts.get(2)) {
            Ok(day) => report(session.update_current_bar(|bar| bar.increment_day(day)), |_| {
                println!("Raised every open hour on {day}.")
            }),
            Err(e) => println!("{}", e),
        },
        Some("must") => {
            let (day, hour) = match (parse_day(parts.get(2)), parse_hour(parts.get(3))) {
                (Ok(d), Ok(h)) => (d, h),
                (Err(e), _) | (_, Err(e)) => {
                    println!("{}", e);
                    return;
                }
            };
            let names = rest(parts, 4);
            report(
                session.update_current_bar(|bar| {
                    let ids = names
                        .split(',')
                        .map(str::trim)
                        .filter(|n| !n.is_empty())
                        .map(|n| worker_id(bar, n))
                        .collect::<Result<Vec<_>, _>>()?;
                    bar.set_mandatory_workers(day, hour, ids)
                }),
                |_| println!("Mandatory staff set for {day} {}.", format_hour(hour)),
            );
        }
        _ => println!("Usage: req show|set|inc|dec|row|col|must ..."),
    }
}

async fn handle_schedule(
    session: &mut Session<Store>,
    generator: &GeminiGenerator,
    parts: &[&str],
) {
    match parts.get(1).copied() {
        Some("show") | None => report(session.current_bar(), print_schedule),
        Some("coverage") => report(session.current_bar(), print_coverage),
        Some("generate") => {
            println!("Generating roster with {}...", generator.model());
            report(session.generate_schedule(generator).await, |count| {
                println!("Roster updated with {count} assignments.");
            });
            if let Ok(bar) = session.current_bar() {
                print_schedule(bar);
            }
        }
        Some("export") => {
            let path = match parts.get(2) {
                Some(p) => p.to_string(),
                None => match session.current_bar() {
                    Ok(bar) => export_file_name(bar),
                    Err(e) => {
                        println!("Error: {}", e);
                        return;
                    }
                },
            };
            let result = session
                .current_bar()
                .and_then(|bar| save_schedule_to_csv(bar, &path).map_err(SessionError::from));
            report(result, |rows| println!("Wrote {rows} rows to {path}."));
        }
        Some("clear") => report(
            session.update_current_bar(|bar| {
                bar.clear_schedule();
                Ok(())
            }),
            |_| println!("Roster cleared."),
        ),
        _ => println!("Usage: schedule show|generate|coverage|export|clear"),
    }
}

#[tokio::main]
async fn main() {
    let config = match RosterConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(2);
        }
    };
    telemetry::init_tracing(config.log_json, "warn");

    let store: Store = match config.open_store() {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Could not open storage: {}", e);
            std::process::exit(1);
        }
    };
    let mut session = match Session::restore(store) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Could not restore session: {}", e);
            std::process::exit(1);
        }
    };
    let generator = match GeminiGenerator::new(config.llm.clone()) {
        Ok(generator) => generator,
        Err(e) => {
            eprintln!("Could not set up the schedule generator: {}", e);
            std::process::exit(1);
        }
    };

    println!("Bar Roster (CLI) - type 'help' for commands\n");
    match session.user() {
        Some(user) => {
            println!("Welcome back, {}.", user.username);
            print_bars(&session);
        }
        None => println!("Not logged in. Use 'register' or 'login'."),
    }

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let parts: Vec<&str> = input.split_whitespace().collect();
        let cmd = parts[0];

        let needs_login = !matches!(cmd, "help" | "quit" | "exit" | "register" | "login");
        if needs_login && session.user().is_none() {
            println!("Please log in first.");
            continue;
        }

        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            "register" => match profile_from(&parts) {
                Some(profile) => report(session.register(profile), |user| {
                    println!("Welcome, {}.", user.username);
                }),
                None => println!("Usage: register <username> <email> <phone> [+code]"),
            },
            "login" => match parts.get(1) {
                Some(username) => match session.login(username) {
                    Ok(user) => {
                        println!("Welcome back, {}.", user.username);
                        print_bars(&session);
                    }
                    Err(e) => println!("Error: {}", e),
                },
                None => println!("Usage: login <username>"),
            },
            "logout" => report(session.logout(), |_| println!("Logged out.")),
            "whoami" => {
                if let Some(user) = session.user() {
                    println!(
                        "{} <{}> {} {}",
                        user.username, user.email, user.country_code, user.phone
                    );
                }
            }
            "profile" => match profile_from(&parts) {
                Some(profile) => report(session.update_profile(profile), |user| {
                    println!("Profile saved for {}.", user.username);
                }),
                None => println!("Usage: profile <username> <email> <phone> [+code]"),
            },
            "bars" => print_bars(&session),
            "bar" => handle_bar(&mut session, &parts),
            "staff" => handle_staff(&mut session, &parts),
            "tags" => handle_tags(&mut session, &parts),
            "req" => handle_req(&mut session, &parts),
            "schedule" => handle_schedule(&mut session, &generator, &parts).await,
            _ => println!("Unknown command. Type 'help'."),
        }
    }
}
