// src/core/build_plan.rs

use crate::core::build_context::{
    ADJUST, CONSOLE, CORDOVA, ENTER, INFO, NOOP, PROXY, RUN, SECTION, SET_GIT_PROXY,
    SET_NPM_PROXY, WARN, WORKSPACE, XML,
};
use crate::core::instructions::InstructionList;
use crate::core::paths::{display_path, expand_user_path};
use crate::models::{BuildRequest, Settings};
use crate::system::proxy::Toggle;
use serde_json::{Value, json};
use std::path::Path;

/// Assembles the instruction list that creates a project.
///
/// `fq_target` is the absolute project directory handed to steps that run after
/// the working directory has moved. `path_exists` decides whether `copyFrom` and
/// `linkTo` point anywhere; when both do, `copyFrom` wins.
pub fn assemble(
    settings: &Settings,
    request: &BuildRequest,
    fq_target: &Path,
    path_exists: impl Fn(&Path) -> bool,
) -> InstructionList {
    let mut list = InstructionList::new();

    // Template source for `cordova create`
    let copy_from_exists = !settings.copy_from.is_empty()
        && path_exists(&expand_user_path(&settings.copy_from));
    let link_to_exists =
        !settings.link_to.is_empty() && path_exists(&expand_user_path(&settings.link_to));

    let mut warnings = Vec::new();
    if !settings.copy_from.is_empty() && !copy_from_exists {
        warnings.push(json!(format!(
            "Ignoring the value of the copyFrom property. {} does not exist.",
            settings.copy_from
        )));
    }
    if !settings.link_to.is_empty() && !link_to_exists {
        warnings.push(json!(format!(
            "Ignoring the value of the linkTo property. {} does not exist.",
            settings.link_to
        )));
    }
    if !warnings.is_empty() {
        list.append_mandatory(Some(CONSOLE), WARN, warnings);
    }

    // Proxy
    let toggle = json!(Toggle::from_flag(settings.proxy.use_proxy).as_str());
    list.append(Some(PROXY), SET_NPM_PROXY, vec![toggle.clone()])
        .append(Some(PROXY), SET_GIT_PROXY, vec![toggle]);

    // Project creation
    let mut create = format!(
        "create {} {} \"{}\"",
        request.target_dir, request.app_id, request.app_name
    );
    if copy_from_exists {
        create.push_str(&format!(" --copy-from \"{}\"", settings.copy_from));
    } else if link_to_exists {
        create.push_str(&format!(" --link-to \"{}\"", settings.link_to));
    }
    if !settings.create_parms.trim().is_empty() {
        create.push(' ');
        create.push_str(settings.create_parms.trim());
    }
    list.append_mandatory(Some(CONSOLE), SECTION, vec![json!("Creating project")])
        .append(Some(CORDOVA), RUN, vec![json!(create)]);

    list.append_mandatory(
        Some(CONSOLE),
        INFO,
        vec![json!(format!("Changing to project folder ({})", request.target_dir))],
    )
    .append_mandatory(Some(WORKSPACE), ENTER, vec![json!(request.target_dir)]);

    // Platforms
    let platforms = if request.platforms.is_empty() {
        &settings.platform_list
    } else {
        &request.platforms
    };
    list.append_mandatory(
        Some(CONSOLE),
        SECTION,
        vec![json!(format!("Adding platforms [{}] to the project", platforms.join(", ")))],
    );
    if platforms.is_empty() {
        list.append_mandatory(
            Some(CONSOLE),
            WARN,
            vec![json!("No platforms specified, skipping.")],
        );
    } else {
        list.append(
            Some(CORDOVA),
            RUN,
            vec![json!(format!("platform add {}", platforms.join(" ")))],
        );
    }

    // Plugins
    let search_path = if settings.plugin_search_path.is_empty() {
        String::new()
    } else {
        format!(" --searchpath \"{}\"", settings.plugin_search_path)
    };
    list.append_mandatory(Some(CONSOLE), SECTION, vec![json!("Adding Cordova Plugins")]);
    for plugin in &settings.plugin_list {
        list.append_mandatory(
            Some(CONSOLE),
            INFO,
            vec![json!(format!("Adding plugin {} to project", plugin))],
        )
        .append(
            Some(CORDOVA),
            RUN,
            vec![json!(format!("plugin add {}{}", plugin, search_path))],
        );
    }

    // config.xml
    let xml_args = vec![
        json!(display_path(fq_target)),
        serde_json::to_value(&settings.config_xml_widget).unwrap_or(Value::Array(Vec::new())),
    ];
    if settings.adjust_config_xml {
        list.append(Some(XML), ADJUST, xml_args);
    } else {
        list.append(None, NOOP, xml_args);
    }

    // cordova prepare
    if settings.run_prepare {
        list.append_mandatory(Some(CONSOLE), INFO, vec![json!("Running cordova prepare")])
            .append_mandatory(Some(CORDOVA), RUN, vec![json!("prepare")]);
    }

    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn request(platforms: &[&str]) -> BuildRequest {
        BuildRequest {
            target_dir: "hello".to_string(),
            app_id: "com.example.hello".to_string(),
            app_name: "Hello World".to_string(),
            platforms: platforms.iter().map(|p| p.to_string()).collect(),
        }
    }

    fn settings() -> Settings {
        Settings {
            plugin_list: vec!["cordova-plugin-device".to_string()],
            platform_list: vec!["android".to_string()],
            ..Settings::default()
        }
    }

    fn steps(list: &InstructionList) -> Vec<String> {
        list.iter()
            .map(|i| {
                let marker = if i.mandatory { "*" } else { "" };
                format!("{}{}", marker, i.step_name_with_args())
            })
            .collect()
    }

    #[test]
    fn test_default_plan() {
        let list = assemble(&settings(), &request(&[]), Path::new("/work/hello"), |_| false);

        assert_eq!(
            steps(&list),
            vec![
                "proxy.setNpmProxy(off)",
                "proxy.setGitProxy(off)",
                "*console.section(Creating project)",
                "cordova.run(create hello com.example.hello \"Hello World\")",
                "*console.info(Changing to project folder (hello))",
                "*workspace.enter(hello)",
                "*console.section(Adding platforms [android] to the project)",
                "cordova.run(platform add android)",
                "*console.section(Adding Cordova Plugins)",
                "*console.info(Adding plugin cordova-plugin-device to project)",
                "cordova.run(plugin add cordova-plugin-device)",
                "noop(/work/hello,[])",
            ]
        );
    }

    #[test]
    fn test_command_line_platforms_win() {
        let list = assemble(&settings(), &request(&["ios", "browser"]), Path::new("/w"), |_| false);
        assert!(steps(&list).contains(&"cordova.run(platform add ios browser)".to_string()));
    }

    #[test]
    fn test_optional_steps() {
        let mut s = settings();
        s.proxy.use_proxy = true;
        s.copy_from = "/templates/base".to_string();
        s.link_to = "/templates/missing".to_string();
        s.create_parms = "--template foo".to_string();
        s.plugin_search_path = "/plugins".to_string();
        s.adjust_config_xml = true;
        s.run_prepare = true;
        s.platform_list.clear();

        let list = assemble(&s, &request(&[]), Path::new("/w/hello"), |p| {
            p == Path::new("/templates/base")
        });
        let steps = steps(&list);

        assert_eq!(
            steps[0],
            "*console.warn(Ignoring the value of the linkTo property. /templates/missing does not exist.)"
        );
        assert_eq!(steps[1], "proxy.setNpmProxy(on)");
        assert_eq!(
            steps[4],
            "cordova.run(create hello com.example.hello \"Hello World\" --copy-from \"/templates/base\" --template foo)"
        );
        assert!(steps.contains(&"*console.warn(No platforms specified, skipping.)".to_string()));
        assert!(steps.contains(
            &"cordova.run(plugin add cordova-plugin-device --searchpath \"/plugins\")".to_string()
        ));
        assert!(steps.contains(&"xml.adjust(/w/hello,[])".to_string()));
        assert_eq!(
            &steps[steps.len() - 2..],
            &["*console.info(Running cordova prepare)", "*cordova.run(prepare)"]
        );
    }

    #[test]
    fn test_link_to_used_when_copy_from_is_absent() {
        let mut s = settings();
        s.link_to = "/shared/www".to_string();
        let list = assemble(&s, &request(&[]), Path::new("/w"), |_| true);
        assert!(
            steps(&list)
                .contains(&"cordova.run(create hello com.example.hello \"Hello World\" --link-to \"/shared/www\")".to_string())
        );
    }

    #[test]
    fn test_search_path_with_spaces_stays_one_argument() {
        let mut s = settings();
        s.plugin_search_path = "/my plugins".to_string();
        let list = assemble(&s, &request(&[]), Path::new("/w"), |_| false);

        let plugin_step = steps(&list)
            .into_iter()
            .find(|step| step.starts_with("cordova.run(plugin add"))
            .unwrap();
        let args = plugin_step.trim_start_matches("cordova.run(").trim_end_matches(')');
        assert_eq!(
            shlex::split(args).unwrap(),
            vec!["plugin", "add", "cordova-plugin-device", "--searchpath", "/my plugins"]
        );
    }
}
