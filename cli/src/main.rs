use std::io::Write;

use brecha::console::{
    AdminAccess, AdminPage, ApiClient, Catalog, Destination, ToastKind,
};
use brecha::model::entity::{
    Lesson, LessonCreate, Level, Module, ModuleCreate, Role, RoleAssignment, UserEntity,
    UserEntityCreateUpdate,
};
use brecha::model::{CrudRepository, DbConnection, ModelManager};
use brecha::web::AuthenticatedUser;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(about = "CLI tool for the brecha course platform", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage users (direct database access)
    User {
        #[command(subcommand)]
        action: UserCommands,
    },

    /// Manage role assignments (direct database access)
    Role {
        #[command(subcommand)]
        action: RoleCommands,
    },

    /// Manage modules (direct database access)
    Module {
        #[command(subcommand)]
        action: ModuleCommands,
    },

    /// Manage lessons (direct database access)
    Lesson {
        #[command(subcommand)]
        action: LessonCommands,
    },

    /// Print the course catalog as the dashboard sees it (over HTTP)
    Catalog {
        #[arg(long, default_value = "http://127.0.0.1:5000")]
        server: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },

    /// Interactive admin console (over HTTP)
    Console {
        #[arg(long, default_value = "http://127.0.0.1:5000")]
        server: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
}

/// User management
#[derive(Subcommand, Debug)]
pub enum UserCommands {
    Add {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "user")]
        role: String,
    },
}

/// Role management
#[derive(Subcommand, Debug)]
pub enum RoleCommands {
    Grant {
        #[arg(long)]
        username: String,
        #[arg(long)]
        role: String,
    },
    Revoke {
        #[arg(long)]
        username: String,
        #[arg(long)]
        role: String,
    },
}

/// Module management
#[derive(Subcommand, Debug)]
pub enum ModuleCommands {
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, default_value = "beginner")]
        level: String,
    },
}

/// Lesson management
#[derive(Subcommand, Debug)]
pub enum LessonCommands {
    Add {
        /// Module title to attach the lesson to
        #[arg(long)]
        module_title: String,
        #[arg(long)]
        title: String,
        /// Path to a Markdown file with lesson content
        #[arg(long)]
        file: String,
        #[arg(long, default_value_t = 0)]
        order_index: i32,
    },
}

fn model_manager() -> brecha::error::AppResult<ModelManager> {
    let db_con = DbConnection::connect(&std::env::var("DATABASE_URL").unwrap())?;
    Ok(ModelManager::new(db_con))
}

async fn find_user(mm: &ModelManager, actor: &AuthenticatedUser, username: &str) -> UserEntity {
    match UserEntity::find_by_username(mm, actor, username).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            eprintln!("user `{}` not found", username);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() -> brecha::error::AppResult<()> {
    let _ = dotenvy::dotenv();
    let args = Cli::parse();
    let actor = AuthenticatedUser::system();

    match args.command {
        Commands::User { action } => match action {
            UserCommands::Add {
                username,
                password,
                role,
            } => {
                let mm = model_manager()?;
                let user = UserEntity::create(
                    &mm,
                    &actor,
                    UserEntityCreateUpdate {
                        username,
                        password_hash: brecha::auth::hash_password(&password)?,
                    },
                )
                .await?;
                RoleAssignment::grant(&mm, &actor, user.id(), Role::from(role.as_str())).await?;
                println!("User created: {:?}", user);
            }
        },

        Commands::Role { action } => match action {
            RoleCommands::Grant { username, role } => {
                let mm = model_manager()?;
                let user = find_user(&mm, &actor, &username).await;
                let role = Role::from(role.as_str());
                RoleAssignment::grant(&mm, &actor, user.id(), role).await?;
                println!("Granted `{}` to `{}`", role, username);
            }
            RoleCommands::Revoke { username, role } => {
                let mm = model_manager()?;
                let user = find_user(&mm, &actor, &username).await;
                let role = Role::from(role.as_str());
                RoleAssignment::revoke(&mm, &actor, user.id(), role).await?;
                println!("Revoked `{}` from `{}`", role, username);
            }
        },

        Commands::Module { action } => match action {
            ModuleCommands::Add {
                title,
                description,
                level,
            } => {
                let mm = model_manager()?;
                let module = Module::create(
                    &mm,
                    &actor,
                    ModuleCreate {
                        title,
                        description,
                        level: Level::from(level.as_str()),
                    },
                )
                .await?;
                println!("Module created: {:?}", module);
            }
        },

        Commands::Lesson { action } => match action {
            LessonCommands::Add {
                module_title,
                title,
                file,
                order_index,
            } => {
                let mm = model_manager()?;
                let module_id: uuid::Uuid =
                    sqlx::query_scalar("SELECT id FROM modules WHERE title = $1")
                        .bind(&module_title)
                        .fetch_one(mm.executor())
                        .await
                        .map_err(brecha::model::DatabaseError::from)?;

                let content = std::fs::read_to_string(file)?;
                let lesson = Lesson::create(
                    &mm,
                    &actor,
                    LessonCreate {
                        module_id,
                        title,
                        content: Some(content),
                        order_index: Some(order_index),
                    },
                )
                .await?;
                println!("Lesson created: {:?}", lesson);
            }
        },

        Commands::Catalog {
            server,
            username,
            password,
        } => {
            let client = sign_in(&server, &username, &password).await;
            match Catalog::load(&client).await {
                Ok(catalog) => print_catalog(&catalog),
                Err(e) => {
                    eprintln!("erro: {}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Console {
            server,
            username,
            password,
        } => {
            let client = sign_in(&server, &username, &password).await;
            run_console(client).await;
        }
    }

    Ok(())
}

async fn sign_in(server: &str, username: &str, password: &str) -> ApiClient {
    let client = ApiClient::new(server);
    if let Err(e) = client.sign_in(username, password).await {
        eprintln!("falha no login: {}", e);
        std::process::exit(1);
    }
    client
}

fn print_catalog(catalog: &Catalog) {
    for entry in catalog.entries() {
        println!("{} [{}]", entry.module.title(), entry.module.level());
        if let Some(desc) = entry.module.description() {
            println!("    {}", desc);
        }
        for lesson in &entry.lessons {
            println!("    #{} {}", lesson.order_index(), lesson.title());
        }
    }
}

fn prompt(label: &str) -> String {
    print!("{}", label);
    std::io::stdout().flush().expect("stdout flush failed");
    let mut line = String::new();
    if std::io::stdin().read_line(&mut line).is_err() {
        return String::new();
    }
    line.trim().to_string()
}

fn show_toasts(page: &mut AdminPage) {
    for toast in page.take_toasts() {
        let tag = match toast.kind() {
            ToastKind::Success => "ok",
            ToastKind::Error => "erro",
        };
        println!("[{}] {}", tag, toast.message());
    }
}

fn render(page: &AdminPage) {
    let tree = page.tree();
    println!("Módulos ({}):", tree.modules().len());
    for (i, module) in tree.modules().iter().enumerate() {
        let marker = if tree.is_expanded(module.id()) { "-" } else { "+" };
        println!("{:>3}. {} {} [{}]", i + 1, marker, module.title(), module.level());
        if tree.is_expanded(module.id()) {
            match tree.lessons_of(module.id()) {
                Some([]) => println!("       (nenhuma lição)"),
                Some(lessons) => {
                    for (j, lesson) in lessons.iter().enumerate() {
                        println!("       {:>2}. #{} {}", j + 1, lesson.order_index(), lesson.title());
                    }
                }
                None => {}
            }
        }
    }
}

fn module_at(page: &AdminPage, arg: Option<&str>) -> Option<uuid::Uuid> {
    let index: usize = arg?.parse().ok()?;
    page.tree()
        .modules()
        .get(index.checked_sub(1)?)
        .map(Module::id)
}

fn lesson_at(page: &AdminPage, module_arg: Option<&str>, lesson_arg: Option<&str>) -> Option<uuid::Uuid> {
    let module_id = module_at(page, module_arg)?;
    let index: usize = lesson_arg?.parse().ok()?;
    page.tree()
        .lessons_of(module_id)?
        .get(index.checked_sub(1)?)
        .map(Lesson::id)
}

fn fill_module_form(page: &mut AdminPage) {
    let title = prompt("Título: ");
    if !title.is_empty() {
        page.module_form_mut().set_title(title);
    }
    let description = prompt("Descrição: ");
    if !description.is_empty() {
        page.module_form_mut().set_description(description);
    }
    let level = prompt("Nível [beginner/intermediate/advanced]: ");
    if !level.is_empty() {
        page.module_form_mut().set_level(Level::from(level.as_str()));
    }
}

fn fill_lesson_form(page: &mut AdminPage) {
    let title = prompt("Título: ");
    if !title.is_empty() {
        page.lesson_form_mut().set_title(title);
    }
    let content = prompt("Conteúdo (markdown): ");
    if !content.is_empty() {
        page.lesson_form_mut().set_content(content);
    }
    let order = prompt("Ordem: ");
    if !order.is_empty() {
        page.lesson_form_mut().set_order_index(order.parse().unwrap_or(0));
    }
}

fn confirm_prompt(page: &AdminPage) -> bool {
    let Some(target) = page.tree().pending_delete() else {
        return false;
    };
    let answer = prompt(&format!(
        "Tem certeza que deseja excluir \"{}\"? [s/N] ",
        target.title
    ));
    answer.eq_ignore_ascii_case("s")
}

const HELP: &str = "\
comandos:
  list                          mostra os módulos
  toggle <n>                    expande/recolhe o módulo n
  new-module                    cria um módulo
  edit-module <n>               edita o módulo n
  new-lesson <n>                cria uma lição no módulo n
  edit-lesson <n> <m>           edita a lição m do módulo n (expandido)
  delete-module <n>             exclui o módulo n (com confirmação)
  delete-lesson <n> <m>         exclui a lição m do módulo n (com confirmação)
  refresh                       recarrega a lista de módulos
  signout                       encerra a sessão
  quit                          sai";

async fn run_console(client: ApiClient) {
    let mut page = match AdminPage::open(&client).await {
        Ok(AdminAccess::Granted(page)) => page,
        Ok(AdminAccess::Redirect(Destination::SignIn)) => {
            eprintln!("sessão expirada, entre novamente");
            std::process::exit(1);
        }
        Ok(AdminAccess::Redirect(Destination::Dashboard)) => {
            eprintln!("acesso restrito a administradores");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("erro: {}", e);
            std::process::exit(1);
        }
    };

    println!("Painel administrativo — {}", page.user().username());
    println!("{}", HELP);
    show_toasts(&mut page);

    loop {
        let line = prompt("brecha> ");
        let mut parts = line.split_whitespace();
        let command = parts.next();
        let first = parts.next();
        let second = parts.next();

        match command {
            Some("list") | Some("ls") => render(&page),
            Some("toggle") => match module_at(&page, first) {
                Some(id) => {
                    page.toggle_module(&client, id).await;
                    render(&page);
                }
                None => println!("módulo inválido"),
            },
            Some("new-module") => {
                page.new_module();
                fill_module_form(&mut page);
                page.save_module(&client).await;
            }
            Some("edit-module") => match module_at(&page, first) {
                Some(id) => {
                    page.edit_module(id);
                    fill_module_form(&mut page);
                    page.save_module(&client).await;
                }
                None => println!("módulo inválido"),
            },
            Some("new-lesson") => match module_at(&page, first) {
                Some(id) => {
                    page.new_lesson(Some(id));
                    fill_lesson_form(&mut page);
                    page.save_lesson(&client).await;
                }
                None => println!("módulo inválido"),
            },
            Some("edit-lesson") => match lesson_at(&page, first, second) {
                Some(id) => {
                    page.edit_lesson(id);
                    fill_lesson_form(&mut page);
                    page.save_lesson(&client).await;
                }
                None => println!("lição inválida (o módulo precisa estar expandido)"),
            },
            Some("delete-module") => match module_at(&page, first) {
                Some(id) => {
                    page.request_delete_module(id);
                    if confirm_prompt(&page) {
                        page.confirm_delete(&client).await;
                    } else {
                        page.cancel_delete();
                    }
                }
                None => println!("módulo inválido"),
            },
            Some("delete-lesson") => match lesson_at(&page, first, second) {
                Some(id) => {
                    page.request_delete_lesson(id);
                    if confirm_prompt(&page) {
                        page.confirm_delete(&client).await;
                    } else {
                        page.cancel_delete();
                    }
                }
                None => println!("lição inválida (o módulo precisa estar expandido)"),
            },
            Some("refresh") => page.reload_modules(&client).await,
            Some("signout") => {
                page.sign_out(&client).await;
                println!("sessão encerrada");
                return;
            }
            Some("quit") | Some("exit") | None => return,
            _ => println!("{}", HELP),
        }

        show_toasts(&mut page);
    }
}
