use rustyline::Editor;
use std::{
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
    process,
    rc::Rc,
};
use toyc::{
    args::Args,
    dot,
    lex::{Lexer, TokenKind},
    Compiler,
};

fn main() {
    env_logger::init();
    let args = Args::new();
    if let Some(file_name) = args.file_name.clone() {
        if let Err(e) = run_file(&args, &file_name) {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    } else {
        run_prompt();
    }
}

fn run_file(args: &Args, file_name: &Path) -> anyhow::Result<()> {
    let source = fs::read_to_string(file_name)?;

    // The token dump is wanted even when the program fails to parse.
    if args.token {
        write_dump(args, file_name, "token", &dump_tokens(&source))?;
    }

    let out = Compiler::new().run(&source)?;
    if args.parse {
        write_dump(args, file_name, "dot", &dot::render(&out.prog))?;
    }
    if args.semantic {
        write_dump(args, file_name, "symbol", &out.table.dump())?;
    }
    Ok(())
}

fn run_prompt() {
    let mut editor = Editor::<()>::new();
    let mut c = Compiler::new();
    while let Ok(line) = editor.readline("$ ") {
        editor.add_history_entry(&line);
        c.run(&line).ok();
    }
}

fn dump_tokens(source: &str) -> String {
    let src: Rc<str> = source.into();
    let mut lexer = Lexer::new(src);
    let mut out = String::new();
    loop {
        match lexer.next_token() {
            Ok(tok) => {
                if tok.kind == TokenKind::Eof {
                    break;
                }
                out.push_str(&format!("{:?} '{}'\n", tok.kind, tok.text));
            }
            Err(e) => out.push_str(&format!("Unknown '{}'\n", e.token)),
        }
    }
    out
}

fn write_dump(args: &Args, input: &Path, ext: &str, contents: &str) -> anyhow::Result<()> {
    let mut path: PathBuf = match &args.output {
        Some(dir) => dir.join(input.file_name().unwrap_or_else(|| OsStr::new("out"))),
        None => input.to_path_buf(),
    };
    path.set_extension(ext);
    fs::write(&path, contents)?;
    Ok(())
}
