use std::path::PathBuf;

use clap::Parser;
use classkit_classroom::models::NewCourse;
use classkit_classroom::sync::EnrollMode;
use classkit_core::roster::RosterFormat;

mod commands;
mod logging;

#[derive(Parser)]
#[command(
    name = "classkit",
    about = "Script routine Google Classroom tasks",
    version
)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "classkit.toml")]
    config: String,

    /// Also append log output to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum FormatArg {
    Csv,
    Json,
}

impl From<FormatArg> for RosterFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => RosterFormat::Csv,
            FormatArg::Json => RosterFormat::Json,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum ModeArg {
    /// Enrol directly (domain administrators only)
    Add,
    /// Send invitations
    Invite,
}

impl From<ModeArg> for EnrollMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Add => EnrollMode::Add,
            ModeArg::Invite => EnrollMode::Invite,
        }
    }
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// List active courses
    Courses,
    /// Create a course owned by the authenticated user
    CreateCourse {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        section: String,
        #[arg(long, default_value = "")]
        room: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Description heading
        #[arg(long, default_value = "")]
        heading: String,
    },
    /// List the students of a course
    Students {
        /// Course id or name
        #[arg(long)]
        course: String,
    },
    /// Export the students of a course to a .csv or .json file
    ExportStudents {
        /// Course id or name
        #[arg(long)]
        course: String,
        #[arg(long)]
        output: PathBuf,
    },
    /// Enrol every student of a roster file into a course
    ImportStudents {
        /// Course id or name
        #[arg(long)]
        course: String,
        /// Roster file (.csv or .json)
        #[arg(long)]
        file: PathBuf,
        /// Roster format, detected from the extension by default
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
        /// Enrolment mode, `roster.mode` from the config by default
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
        /// Parse and print the roster without contacting Classroom
        #[arg(long)]
        dry_run: bool,
        /// Write records that were not enrolled to this CSV file (removed after a clean run)
        #[arg(long)]
        failed_out: Option<PathBuf>,
    },
    /// Post an announcement to all students of a course
    Announce {
        /// Course id or name
        #[arg(long)]
        course: String,
        #[arg(long)]
        text: String,
        /// Attach a link (repeatable)
        #[arg(long = "link")]
        links: Vec<String>,
    },
    /// Create a topic unless one with the same name exists
    CreateTopic {
        /// Course id or name
        #[arg(long)]
        course: String,
        #[arg(long)]
        name: String,
    },
    /// Publish course material
    CreateMaterial {
        /// Course id or name
        #[arg(long)]
        course: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Topic name, created when missing
        #[arg(long)]
        topic: Option<String>,
        /// Attach a link (repeatable)
        #[arg(long = "link")]
        links: Vec<String>,
        /// Attach a Drive file by id (repeatable)
        #[arg(long = "drive-file")]
        drive_files: Vec<String>,
        /// Attach a YouTube video by id (repeatable)
        #[arg(long = "youtube")]
        youtube: Vec<String>,
        /// Save as draft instead of publishing
        #[arg(long)]
        draft: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(cli.log_file.as_deref())?;

    match cli.command {
        Commands::Init { force } => {
            commands::init::run(&cli.config, force).await?;
        }
        Commands::Courses => {
            commands::courses::list(&cli.config).await?;
        }
        Commands::CreateCourse {
            name,
            section,
            room,
            description,
            heading,
        } => {
            let course = NewCourse {
                name,
                section,
                room,
                description,
                description_heading: heading,
            };
            commands::courses::create(&cli.config, course).await?;
        }
        Commands::Students { course } => {
            commands::students::list(&cli.config, &course).await?;
        }
        Commands::ExportStudents { course, output } => {
            commands::students::export(&cli.config, &course, &output).await?;
        }
        Commands::ImportStudents {
            course,
            file,
            format,
            mode,
            dry_run,
            failed_out,
        } => {
            let opts = commands::import_students::ImportOptions {
                course,
                file,
                format: format.map(Into::into),
                mode: mode.map(Into::into),
                dry_run,
                failed_out,
            };
            commands::import_students::run(&cli.config, opts).await?;
        }
        Commands::Announce {
            course,
            text,
            links,
        } => {
            commands::announce::run(&cli.config, &course, &text, &links).await?;
        }
        Commands::CreateTopic { course, name } => {
            commands::materials::create_topic(&cli.config, &course, &name).await?;
        }
        Commands::CreateMaterial {
            course,
            title,
            description,
            topic,
            links,
            drive_files,
            youtube,
            draft,
        } => {
            let opts = commands::materials::MaterialOptions {
                course,
                title,
                description,
                topic,
                links,
                drive_files,
                youtube,
                draft,
            };
            commands::materials::create_material(&cli.config, opts).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn cli_parse_init_defaults() {
        let cli = Cli::parse_from(["classkit", "init"]);
        assert_eq!(cli.config, "classkit.toml");
        assert!(cli.log_file.is_none());
        match cli.command {
            Commands::Init { force } => assert!(!force),
            _ => panic!("expected Init command"),
        }
    }

    #[test]
    fn cli_parse_global_flags() {
        let cli = Cli::parse_from([
            "classkit",
            "--config",
            "/etc/classkit.toml",
            "--log-file",
            "classkit.log",
            "init",
            "--force",
        ]);
        assert_eq!(cli.config, "/etc/classkit.toml");
        assert_eq!(cli.log_file, Some(PathBuf::from("classkit.log")));
        assert!(matches!(cli.command, Commands::Init { force: true }));
    }

    #[test]
    fn cli_parse_courses() {
        let cli = Cli::parse_from(["classkit", "courses"]);
        assert!(matches!(cli.command, Commands::Courses));
    }

    #[test]
    fn cli_parse_create_course_defaults() {
        let cli = Cli::parse_from(["classkit", "create-course", "--name", "Algebra"]);
        match cli.command {
            Commands::CreateCourse {
                name,
                section,
                heading,
                ..
            } => {
                assert_eq!(name, "Algebra");
                assert_eq!(section, "");
                assert_eq!(heading, "");
            }
            _ => panic!("expected CreateCourse command"),
        }
    }

    #[test]
    fn cli_parse_import_students_defaults() {
        let cli = Cli::parse_from([
            "classkit",
            "import-students",
            "--course",
            "Algebra",
            "--file",
            "roster.csv",
        ]);
        match cli.command {
            Commands::ImportStudents {
                course,
                file,
                format,
                mode,
                dry_run,
                failed_out,
            } => {
                assert_eq!(course, "Algebra");
                assert_eq!(file, PathBuf::from("roster.csv"));
                assert!(format.is_none());
                assert!(mode.is_none());
                assert!(!dry_run);
                assert!(failed_out.is_none());
            }
            _ => panic!("expected ImportStudents command"),
        }
    }

    #[test]
    fn cli_parse_import_students_all_flags() {
        let cli = Cli::parse_from([
            "classkit",
            "import-students",
            "--course",
            "770249109796",
            "--file",
            "roster.txt",
            "--format",
            "json",
            "--mode",
            "add",
            "--dry-run",
            "--failed-out",
            "retry.csv",
        ]);
        match cli.command {
            Commands::ImportStudents {
                format,
                mode,
                dry_run,
                failed_out,
                ..
            } => {
                assert_eq!(format.map(RosterFormat::from), Some(RosterFormat::Json));
                assert_eq!(mode.map(EnrollMode::from), Some(EnrollMode::Add));
                assert!(dry_run);
                assert_eq!(failed_out, Some(PathBuf::from("retry.csv")));
            }
            _ => panic!("expected ImportStudents command"),
        }
    }

    #[test]
    fn cli_rejects_unknown_mode() {
        let result = Cli::try_parse_from([
            "classkit",
            "import-students",
            "--course",
            "c1",
            "--file",
            "r.csv",
            "--mode",
            "enroll",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn cli_parse_announce_repeated_links() {
        let cli = Cli::parse_from([
            "classkit",
            "announce",
            "--course",
            "c1",
            "--text",
            "Hello",
            "--link",
            "https://a.example",
            "--link",
            "https://b.example",
        ]);
        match cli.command {
            Commands::Announce { links, .. } => assert_eq!(links.len(), 2),
            _ => panic!("expected Announce command"),
        }
    }

    #[test]
    fn cli_parse_create_material() {
        let cli = Cli::parse_from([
            "classkit",
            "create-material",
            "--course",
            "c1",
            "--title",
            "Slides",
            "--topic",
            "Week 1",
            "--drive-file",
            "abc",
            "--youtube",
            "xyz",
            "--draft",
        ]);
        match cli.command {
            Commands::CreateMaterial {
                topic,
                drive_files,
                youtube,
                links,
                draft,
                ..
            } => {
                assert_eq!(topic.as_deref(), Some("Week 1"));
                assert_eq!(drive_files, vec!["abc"]);
                assert_eq!(youtube, vec!["xyz"]);
                assert!(links.is_empty());
                assert!(draft);
            }
            _ => panic!("expected CreateMaterial command"),
        }
    }

    #[test]
    fn cli_parse_create_topic_and_students() {
        let cli = Cli::parse_from(["classkit", "create-topic", "--course", "c1", "--name", "Labs"]);
        assert!(matches!(cli.command, Commands::CreateTopic { .. }));

        let cli = Cli::parse_from([
            "classkit",
            "export-students",
            "--course",
            "c1",
            "--output",
            "out.json",
        ]);
        match cli.command {
            Commands::ExportStudents { output, .. } => {
                assert_eq!(output, PathBuf::from("out.json"))
            }
            _ => panic!("expected ExportStudents command"),
        }
    }
}
