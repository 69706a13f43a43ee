use crate::prompt_agent::{OutputFormat, PromptAgentSpec};

/// Task keywords that switch the strategy agents to task-specific prompts.
const FOCUS_KEYWORDS: &[&str] = &["big thing", "next"];

/// Definitions of the built-in agents, in alphabetical order.
pub fn builtin_specs() -> Vec<PromptAgentSpec> {
    vec![
        benchmark(),
        critic(),
        devops_engineer(),
        evolver(),
        growth_hacker(),
        market_researcher(),
        mcp_engineer(),
        product_strategist(),
        qa_tester(),
        system_architect(),
        ui_ux_designer(),
    ]
}

fn benchmark() -> PromptAgentSpec {
    PromptAgentSpec::new("benchmark", "Run 5 trials, measure speed")
        .with_description("Performance testing and metrics")
        .with_outputs(&["perf/report.json"])
        .with_format(OutputFormat::JsonEnvelope)
}

fn critic() -> PromptAgentSpec {
    PromptAgentSpec::new("critic", "Find 3 bugs in last output")
        .with_description("Code review and quality assessment")
        .with_outputs(&["review/fixes.md"])
}

fn devops_engineer() -> PromptAgentSpec {
    PromptAgentSpec::new("devops_engineer", DEVOPS_PROMPT)
        .with_description("Setting up deployment and infrastructure")
        .with_outputs(&["deploy/README.md"])
}

fn evolver() -> PromptAgentSpec {
    PromptAgentSpec::new("evolver", "Improve last agent prompt by 20%")
        .with_description("Self-improvement and optimization")
        .with_outputs(&["agents/improved_agent.md"])
}

fn growth_hacker() -> PromptAgentSpec {
    PromptAgentSpec::new("growth_hacker", "Write 5 X threads + HN post")
        .with_description("Planning marketing and growth strategies")
        .with_outputs(&["growth/x-threads.md", "growth/hn-post.md"])
}

fn market_researcher() -> PromptAgentSpec {
    PromptAgentSpec::new(
        "market_researcher",
        "Analyze CrewAI, Autogen, LangGraph. Output JSON: {pricing, stars, weaknesses}",
    )
    .with_description("Analyzing market opportunities and competitors")
    .with_focus(
        FOCUS_KEYWORDS,
        "Research the market opportunity for \"{task}\". Analyze competitors, market size, trends, and opportunities. Output comprehensive market analysis.",
    )
    .with_outputs(&["research/competitors.json"])
    .with_focused_outputs(&["research/market_analysis.md"])
}

fn mcp_engineer() -> PromptAgentSpec {
    PromptAgentSpec::new("mcp_engineer", MCP_ENGINEER_PROMPT)
        .with_description("Building MCP servers and integrations")
        .with_outputs(&["mcp/servers.md"])
}

fn product_strategist() -> PromptAgentSpec {
    PromptAgentSpec::new("product_strategist", "Define 3 MVP features + paid upgrade path")
        .with_description("Planning product strategy and roadmap")
        .with_focus(
            FOCUS_KEYWORDS,
            "Create a product strategy and roadmap for \"{task}\". Define MVP features, monetization model, target market, and go-to-market strategy.",
        )
        .with_outputs(&["plan/roadmap.md"])
}

fn qa_tester() -> PromptAgentSpec {
    PromptAgentSpec::new("qa_tester", "Fuzz MCPs, test sandbox escape")
        .with_description("Testing security and quality assurance")
        .with_outputs(&["test/report.md"])
}

fn system_architect() -> PromptAgentSpec {
    PromptAgentSpec::new("system_architect", "Design zero-cost architecture with Fly.io free")
        .with_description("Designing technical architecture")
        .with_focus(
            FOCUS_KEYWORDS,
            "Design a complete technical architecture for \"{task}\". Include frontend, backend, database, deployment, security, and scalability considerations.",
        )
        .with_outputs(&["arch/system.mmd"])
}

fn ui_ux_designer() -> PromptAgentSpec {
    PromptAgentSpec::new("ui_ux_designer", "Generate React + Tailwind dashboard")
        .with_description("Creating user interface and experience")
        .with_outputs(&["ui/App.tsx"])
}

const DEVOPS_PROMPT: &str = "\
Plan the deployment infrastructure: a multi-stage Dockerfile, \
a Fly.io fly.toml on the free tier, a docker-compose.yml for local development \
and a GitHub Actions workflow that builds, tests and deploys on push to main.";

const MCP_ENGINEER_PROMPT: &str = "\
Specify two MCP servers over stdio: file-search (tools search_files and \
read_file with glob patterns) and image-gen (tool generate_placeholder). \
List each tool with its input schema.";
