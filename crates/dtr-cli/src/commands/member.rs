//! Member registry commands.

use std::io::Write;

use anyhow::Result;

use dtr_core::Member;
use dtr_engine::Engine;

use crate::cli::MemberAction;

pub fn run<W: Write>(writer: &mut W, engine: &Engine, action: &MemberAction) -> Result<()> {
    match action {
        MemberAction::Add {
            id,
            name,
            birthday,
            committee,
            photo,
        } => {
            let member = Member {
                member_id: id.clone(),
                display_name: name.clone(),
                birthday: *birthday,
                committee: committee.clone(),
                photo: photo.clone(),
            };
            engine.add_member(&member)?;
            writeln!(writer, "Member {} ({}) added.", member.display_name, member.member_id)?;
            Ok(())
        }
        MemberAction::List { search, json } => list(writer, engine, search.as_deref(), *json),
        MemberAction::Update {
            id,
            name,
            birthday,
            committee,
            photo,
        } => {
            let mut member = engine.get_member(id)?;
            if let Some(name) = name {
                member.display_name.clone_from(name);
            }
            if let Some(birthday) = birthday {
                member.birthday = Some(*birthday);
            }
            if let Some(committee) = committee {
                member.committee.clone_from(committee);
            }
            if let Some(photo) = photo {
                member.photo = Some(photo.clone());
            }
            engine.update_member(&member)?;
            writeln!(writer, "Member {} ({}) updated.", member.display_name, member.member_id)?;
            Ok(())
        }
        MemberAction::Remove { id } => {
            let member = engine.get_member(id)?;
            engine.remove_member(id)?;
            writeln!(
                writer,
                "Member {} ({}) removed, along with their entire scan history.",
                member.display_name, member.member_id
            )?;
            Ok(())
        }
    }
}

fn list<W: Write>(writer: &mut W, engine: &Engine, search: Option<&str>, json: bool) -> Result<()> {
    let members = engine.list_members(search)?;
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&members)?)?;
        return Ok(());
    }
    if members.is_empty() {
        writeln!(writer, "No members registered.")?;
        return Ok(());
    }
    writeln!(writer, "Members: {}", members.len())?;
    for member in &members {
        match member.birthday {
            Some(birthday) => writeln!(
                writer,
                "- {} ({}): {}, birthday {birthday}",
                member.display_name, member.member_id, member.committee
            )?,
            None => writeln!(
                writer,
                "- {} ({}): {}",
                member.display_name, member.member_id, member.committee
            )?,
        }
    }
    Ok(())
}
